use sqlx::Row;
use tutor_core::model::{
    AnswerSet, AssessmentId, AssessmentSession, LearnerId, LearnerProfile, NewAssessment,
};

use super::{
    SqliteRepository,
    mapping::{
        assessment_id_from_i64, db_err, encode_answers, encode_snapshot, id_i64,
        map_assessment_row, ser,
    },
};
use crate::repository::{AssessmentRepository, StartedSession, StorageError};

const ASSESSMENT_COLUMNS: &str = "id, learner_id, questions, answers, status, score, \
     resulting_level, started_at, completed_at";

async fn update_session<'e, E>(
    executor: E,
    session: &AssessmentSession,
) -> Result<u64, StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let res = sqlx::query(
        r"
        UPDATE assessments
        SET answers = ?2, status = ?3, score = ?4, resulting_level = ?5, completed_at = ?6
        WHERE id = ?1 AND status = 'in_progress'
        ",
    )
    .bind(id_i64("assessment_id", session.id().value())?)
    .bind(encode_answers(session.answers())?)
    .bind(session.status().as_str())
    .bind(session.score())
    .bind(session.resulting_level().map(|l| l.as_str()))
    .bind(session.completed_at())
    .execute(executor)
    .await
    .map_err(db_err)?;

    Ok(res.rows_affected())
}

/// Explain why a guarded update touched no row: missing session, or one that already
/// left `in_progress`.
async fn stale_update<'e, E>(executor: E, id: AssessmentId) -> StorageError
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let Ok(raw) = id_i64("assessment_id", id.value()) else {
        return StorageError::NotFound;
    };
    match sqlx::query("SELECT 1 FROM assessments WHERE id = ?1")
        .bind(raw)
        .fetch_optional(executor)
        .await
    {
        Ok(Some(_)) => StorageError::Conflict,
        Ok(None) => StorageError::NotFound,
        Err(e) => db_err(e),
    }
}

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn start_assessment(&self, new: NewAssessment) -> Result<StartedSession, StorageError> {
        let learner = id_i64("learner_id", new.learner_id.value())?;
        let snapshot = encode_snapshot(&new.questions)?;
        let empty_answers = encode_answers(&AnswerSet::new())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let previous = sqlx::query(
            r"
            SELECT id FROM assessments
            WHERE learner_id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(learner)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let abandoned = match previous {
            Some(row) => {
                let id = assessment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
                sqlx::query("UPDATE assessments SET status = 'abandoned' WHERE id = ?1")
                    .bind(id_i64("assessment_id", id.value())?)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
                Some(id)
            }
            None => None,
        };

        // A lost race surfaces here as a unique violation or a busy write lock; both
        // map to `Conflict`.
        let res = sqlx::query(
            r"
            INSERT INTO assessments (learner_id, questions, answers, status, score, started_at)
            VALUES (?1, ?2, ?3, 'in_progress', 0, ?4)
            ",
        )
        .bind(learner)
        .bind(snapshot)
        .bind(empty_answers)
        .bind(new.started_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        let session = new.assign_id(assessment_id_from_i64(res.last_insert_rowid())?);
        Ok(StartedSession { session, abandoned })
    }

    async fn get_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        let sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("assessment_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_assessment_row).transpose()
    }

    async fn in_progress_for(
        &self,
        learner: LearnerId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments \
             WHERE learner_id = ?1 AND status = 'in_progress'"
        );
        let row = sqlx::query(&sql)
            .bind(id_i64("learner_id", learner.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_assessment_row).transpose()
    }

    async fn save_assessment(&self, session: &AssessmentSession) -> Result<(), StorageError> {
        if update_session(&self.pool, session).await? == 0 {
            return Err(stale_update(&self.pool, session.id()).await);
        }
        Ok(())
    }

    async fn finish_assessment(
        &self,
        session: &AssessmentSession,
        learner: &LearnerProfile,
    ) -> Result<(), StorageError> {
        if session.learner_id() != learner.id() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if update_session(&mut *tx, session).await? == 0 {
            return Err(stale_update(&mut *tx, session.id()).await);
        }

        let res = sqlx::query(
            r"
            UPDATE learners SET current_level = ?2, updated_at = ?3
            WHERE id = ?1
            ",
        )
        .bind(id_i64("learner_id", learner.id().value())?)
        .bind(learner.current_level().map(|l| l.as_str()))
        .bind(learner.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
