use tutor_core::model::{ProficiencyLevel, Task, TaskId, TaskQuestion, TaskType};

use super::{
    SqliteRepository,
    mapping::{db_err, id_i64, map_task_row},
    question_repo::write_task_questions,
};
use crate::repository::{StorageError, TaskRepository};

const TASK_COLUMNS: &str = "id, level, title, task_type, body, media_url, explanation, status, \
     created_at, updated_at";

async fn write_task<'e, E>(executor: E, task: &Task) -> Result<(), StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r"
        INSERT INTO tasks (
            id, level, title, task_type, body, media_url, explanation,
            status, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            -- keep created_at from the original insert
            level = excluded.level,
            title = excluded.title,
            task_type = excluded.task_type,
            body = excluded.body,
            media_url = excluded.media_url,
            explanation = excluded.explanation,
            status = excluded.status,
            updated_at = excluded.updated_at
        ",
    )
    .bind(id_i64("task_id", task.id().value())?)
    .bind(task.level().as_str())
    .bind(task.title().to_owned())
    .bind(task.task_type().as_str())
    .bind(task.content().as_text().map(str::to_owned))
    .bind(task.content().media_url().map(ToString::to_string))
    .bind(task.explanation().map(str::to_owned))
    .bind(task.status().as_str())
    .bind(task.created_at())
    .bind(task.updated_at())
    .execute(executor)
    .await
    .map_err(db_err)?;

    Ok(())
}

#[async_trait::async_trait]
impl TaskRepository for SqliteRepository {
    async fn upsert_task(&self, task: &Task) -> Result<(), StorageError> {
        write_task(&self.pool, task).await
    }

    async fn save_task_with_questions(
        &self,
        task: &Task,
        questions: &[TaskQuestion],
    ) -> Result<usize, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        write_task(&mut *tx, task).await?;
        let removed = write_task_questions(&mut tx, task.id(), questions).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(removed)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("task_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_task_row).transpose()
    }

    async fn published_tasks(
        &self,
        levels: &[ProficiencyLevel],
        task_type: Option<TaskType>,
    ) -> Result<Vec<Task>, StorageError> {
        if levels.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = 'published' AND level IN ("
        );
        for i in 0..levels.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');
        if task_type.is_some() {
            sql.push_str(&format!(" AND task_type = ?{}", levels.len() + 1));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut q = sqlx::query(&sql);
        for level in levels {
            q = q.bind(level.as_str());
        }
        if let Some(kind) = task_type {
            q = q.bind(kind.as_str());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            tasks.push(map_task_row(&row)?);
        }
        Ok(tasks)
    }
}
