use std::collections::HashMap;

use sqlx::SqliteConnection;
use tutor_core::model::{AssessmentQuestion, QuestionId, TaskId, TaskQuestion};

use super::{
    SqliteRepository,
    mapping::{db_err, encode_options, id_i64, map_assessment_question_row, map_task_question_row},
};
use crate::repository::{QuestionBank, StorageError};

/// Swap a task's question list on an open connection, returning how many rows went away.
/// Callers own the surrounding transaction.
pub(super) async fn write_task_questions(
    conn: &mut SqliteConnection,
    task_id: TaskId,
    questions: &[TaskQuestion],
) -> Result<usize, StorageError> {
    if questions.iter().any(|q| q.task_id() != task_id) {
        return Err(StorageError::Conflict);
    }
    let task = id_i64("task_id", task_id.value())?;

    let removed = sqlx::query("DELETE FROM task_questions WHERE task_id = ?1")
        .bind(task)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?
        .rows_affected();

    for question in questions {
        // An id already owned by another task surfaces as `Conflict`.
        sqlx::query(
            r"
            INSERT INTO task_questions
                (id, task_id, text, options, correct_answer, weight, display_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(task)
        .bind(question.text().to_owned())
        .bind(encode_options(question.options())?)
        .bind(i64::from(question.correct_answer()))
        .bind(question.weight())
        .bind(i64::from(question.order()))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    }

    usize::try_from(removed).map_err(|_| StorageError::Serialization("count overflow".into()))
}

#[async_trait::async_trait]
impl QuestionBank for SqliteRepository {
    async fn upsert_assessment_question(
        &self,
        question: &AssessmentQuestion,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO assessment_questions (id, level, text, options, correct_answer, weight, skill)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                level = excluded.level,
                text = excluded.text,
                options = excluded.options,
                correct_answer = excluded.correct_answer,
                weight = excluded.weight,
                skill = excluded.skill
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(question.level().as_str())
        .bind(question.text().to_owned())
        .bind(encode_options(question.options())?)
        .bind(i64::from(question.correct_answer()))
        .bind(question.weight())
        .bind(question.skill().map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_assessment_questions(&self) -> Result<Vec<AssessmentQuestion>, StorageError> {
        // Level strings sort in CEFR order.
        let rows = sqlx::query(
            r"
            SELECT id, level, text, options, correct_answer, weight, skill
            FROM assessment_questions
            ORDER BY level ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_assessment_question_row(&row)?);
        }
        Ok(out)
    }

    async fn get_assessment_questions(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AssessmentQuestion>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT id, level, text, options, correct_answer, weight, skill
            FROM assessment_questions
            WHERE id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n");

        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id_i64("question_id", id.value())?);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_id: HashMap<QuestionId, AssessmentQuestion> =
            HashMap::with_capacity(rows.len());
        for row in rows {
            let question = map_assessment_question_row(&row)?;
            by_id.insert(question.id(), question);
        }

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.get(id) {
                Some(question) => out.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn replace_task_questions(
        &self,
        task_id: TaskId,
        questions: &[TaskQuestion],
    ) -> Result<usize, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let removed = write_task_questions(&mut tx, task_id, questions).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(removed)
    }

    async fn task_questions(&self, task_id: TaskId) -> Result<Vec<TaskQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, task_id, text, options, correct_answer, weight, display_order
            FROM task_questions
            WHERE task_id = ?1
            ORDER BY display_order ASC, id ASC
            ",
        )
        .bind(id_i64("task_id", task_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_task_question_row(&row)?);
        }
        Ok(out)
    }
}
