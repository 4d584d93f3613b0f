use tutor_core::model::{LearnerId, TaskId, TaskProgress};

use super::{
    SqliteRepository,
    mapping::{encode_answers, id_i64, map_progress_row},
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        task: TaskId,
    ) -> Result<Option<TaskProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, task_id, answers, score, percentage_correct,
                   completed_at, time_taken_secs
            FROM task_progress
            WHERE learner_id = ?1 AND task_id = ?2
            ",
        )
        .bind(id_i64("learner_id", learner.value())?)
        .bind(id_i64("task_id", task.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert_progress(&self, progress: &TaskProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO task_progress (
                learner_id, task_id, answers, score, percentage_correct,
                completed_at, time_taken_secs
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(learner_id, task_id) DO UPDATE SET
                answers = excluded.answers,
                score = excluded.score,
                percentage_correct = excluded.percentage_correct,
                completed_at = excluded.completed_at,
                time_taken_secs = excluded.time_taken_secs
            ",
        )
        .bind(id_i64("learner_id", progress.learner_id.value())?)
        .bind(id_i64("task_id", progress.task_id.value())?)
        .bind(encode_answers(&progress.answers)?)
        .bind(progress.score)
        .bind(progress.percentage_correct)
        .bind(progress.completed_at)
        .bind(progress.time_taken_secs)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn progress_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<TaskProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, task_id, answers, score, percentage_correct,
                   completed_at, time_taken_secs
            FROM task_progress
            WHERE learner_id = ?1
            ORDER BY completed_at DESC, task_id DESC
            ",
        )
        .bind(id_i64("learner_id", learner.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }
}
