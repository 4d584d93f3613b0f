use chrono::{DateTime, Utc};
use tutor_core::model::{LearnerId, LearnerProfile};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_learner_row, ser},
};
use crate::repository::{LearnerRepository, StorageError};

const LEARNER_COLUMNS: &str =
    "id, telegram_user_id, username, current_level, is_active, created_at, updated_at";

#[async_trait::async_trait]
impl LearnerRepository for SqliteRepository {
    async fn get_or_create_learner(
        &self,
        telegram_user_id: &str,
        username: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LearnerProfile, StorageError> {
        let telegram_user_id = telegram_user_id.trim();
        if telegram_user_id.is_empty() {
            return Err(ser("telegram user id cannot be empty"));
        }

        // A concurrent insert of the same telegram id loses quietly and reads the winner.
        sqlx::query(
            r"
            INSERT INTO learners (telegram_user_id, username, is_active, created_at, updated_at)
            VALUES (?1, ?2, 1, ?3, ?4)
            ON CONFLICT(telegram_user_id) DO NOTHING
            ",
        )
        .bind(telegram_user_id)
        .bind(username)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.find_by_telegram_id(telegram_user_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Option<LearnerProfile>, StorageError> {
        let sql = format!("SELECT {LEARNER_COLUMNS} FROM learners WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("learner_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_learner_row).transpose()
    }

    async fn find_by_telegram_id(
        &self,
        telegram_user_id: &str,
    ) -> Result<Option<LearnerProfile>, StorageError> {
        let sql = format!("SELECT {LEARNER_COLUMNS} FROM learners WHERE telegram_user_id = ?1");
        let row = sqlx::query(&sql)
            .bind(telegram_user_id.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_learner_row).transpose()
    }

    async fn save_learner(&self, learner: &LearnerProfile) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE learners
            SET username = ?2, current_level = ?3, is_active = ?4, updated_at = ?5
            WHERE id = ?1
            ",
        )
        .bind(id_i64("learner_id", learner.id().value())?)
        .bind(learner.username())
        .bind(learner.current_level().map(|l| l.as_str()))
        .bind(i64::from(learner.is_active()))
        .bind(learner.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
