//! `SQLite` adapter for every repository contract.
//!
//! One pool serves all five repositories. Writers serialize on the database lock
//! (WAL keeps readers unblocked), and the partial unique index
//! `idx_assessments_one_in_progress` backs the one-quiz-in-progress-per-learner rule:
//! whichever `start_assessment` loses a race gets `StorageError::Conflict` rather than a
//! second open session.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    AssessmentRepository, LearnerRepository, ProgressRepository, QuestionBank, Storage,
    TaskRepository,
};

mod assessment_repo;
mod learner_repo;
mod mapping;
mod migrate;
mod progress_repo;
mod question_repo;
mod task_repo;

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;
const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open a pool on `database_url` with foreign keys enforced (task questions, progress
    /// and assessments all reference their parents), WAL journaling and a busy timeout.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection or any pragma fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema up to the latest version; already-applied versions are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Connect, migrate, and hand every repository handle the same pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self {
            learners: Arc::new(repo.clone()) as Arc<dyn LearnerRepository>,
            assessments: Arc::new(repo.clone()) as Arc<dyn AssessmentRepository>,
            questions: Arc::new(repo.clone()) as Arc<dyn QuestionBank>,
            tasks: Arc::new(repo.clone()) as Arc<dyn TaskRepository>,
            progress: Arc::new(repo) as Arc<dyn ProgressRepository>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_enforces_foreign_keys_and_the_in_progress_index() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_pragmas?mode=memory&cache=shared")
            .await
            .unwrap();
        repo.migrate().await.unwrap();

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);

        let index: Option<String> = sqlx::query_scalar(
            "SELECT sql FROM sqlite_master WHERE name = 'idx_assessments_one_in_progress'",
        )
        .fetch_optional(repo.pool())
        .await
        .unwrap();
        let index = index.expect("partial index exists");
        assert!(index.contains("status = 'in_progress'"));
    }
}
