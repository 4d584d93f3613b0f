use std::sync::Arc;

use storage::repository::LearnerRepository;
use tracing::info;
use tutor_core::model::{LearnerError, LearnerProfile};

use crate::Clock;
use crate::error::LearnerServiceError;

/// Registers learners as they first talk to the bot.
#[derive(Clone)]
pub struct LearnerService {
    clock: Clock,
    learners: Arc<dyn LearnerRepository>,
}

impl LearnerService {
    #[must_use]
    pub fn new(clock: Clock, learners: Arc<dyn LearnerRepository>) -> Self {
        Self { clock, learners }
    }

    /// Return the learner for `telegram_user_id`, creating a level-less profile on first contact.
    ///
    /// # Errors
    ///
    /// Returns `LearnerServiceError::Learner` for a blank telegram id.
    /// Returns `LearnerServiceError::Storage` if persistence fails.
    pub async fn register(
        &self,
        telegram_user_id: &str,
        username: Option<&str>,
    ) -> Result<LearnerProfile, LearnerServiceError> {
        let telegram_user_id = telegram_user_id.trim();
        if telegram_user_id.is_empty() {
            return Err(LearnerError::EmptyTelegramId.into());
        }
        let username = username.map(str::trim).filter(|u| !u.is_empty());

        let learner = self
            .learners
            .get_or_create_learner(telegram_user_id, username, self.clock.now())
            .await?;
        info!(
            learner_id = %learner.id(),
            telegram_user_id,
            level = ?learner.current_level(),
            "learner registered"
        );
        Ok(learner)
    }

    /// Look up a learner without creating one.
    ///
    /// # Errors
    ///
    /// Returns `LearnerServiceError::Storage` if repository access fails.
    pub async fn find(
        &self,
        telegram_user_id: &str,
    ) -> Result<Option<LearnerProfile>, LearnerServiceError> {
        Ok(self.learners.find_by_telegram_id(telegram_user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use tutor_core::time::fixed_clock;

    fn service() -> LearnerService {
        LearnerService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn register_is_get_or_create() {
        let svc = service();
        let first = svc.register("77", Some("  kim ")).await.unwrap();
        let second = svc.register("77", None).await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(first.username(), Some("kim"));
        assert_eq!(first.current_level(), None);
    }

    #[tokio::test]
    async fn blank_telegram_id_is_rejected() {
        let err = service().register("   ", None).await.unwrap_err();
        assert!(matches!(
            err,
            LearnerServiceError::Learner(LearnerError::EmptyTelegramId)
        ));
    }

    #[tokio::test]
    async fn find_does_not_create() {
        let svc = service();
        assert!(svc.find("1").await.unwrap().is_none());
        svc.register("1", None).await.unwrap();
        assert!(svc.find("1").await.unwrap().is_some());
    }
}
