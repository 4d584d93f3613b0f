use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::LearnerId;
use crate::model::level::ProficiencyLevel;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("telegram user id cannot be empty")]
    EmptyTelegramId,
}

/// A learner known to the bot.
///
/// `current_level` stays `None` until the first assessment completes and is only
/// changed by a completed assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerProfile {
    id: LearnerId,
    telegram_user_id: String,
    username: Option<String>,
    current_level: Option<ProficiencyLevel>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LearnerProfile {
    /// # Errors
    ///
    /// Returns `LearnerError::EmptyTelegramId` for a blank telegram id.
    pub fn new(
        id: LearnerId,
        telegram_user_id: impl Into<String>,
        username: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, LearnerError> {
        Self::from_persisted(id, telegram_user_id, username, None, true, now, now)
    }

    /// # Errors
    ///
    /// Returns `LearnerError::EmptyTelegramId` for a blank telegram id.
    pub fn from_persisted(
        id: LearnerId,
        telegram_user_id: impl Into<String>,
        username: Option<String>,
        current_level: Option<ProficiencyLevel>,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, LearnerError> {
        let telegram_user_id = telegram_user_id.into().trim().to_owned();
        if telegram_user_id.is_empty() {
            return Err(LearnerError::EmptyTelegramId);
        }
        Ok(Self {
            id,
            telegram_user_id,
            username,
            current_level,
            is_active,
            created_at,
            updated_at,
        })
    }

    /// Stores the level produced by a completed assessment.
    pub fn apply_assessed_level(&mut self, level: ProficiencyLevel, at: DateTime<Utc>) {
        self.current_level = Some(level);
        self.updated_at = at;
    }

    #[must_use]
    pub fn id(&self) -> LearnerId {
        self.id
    }

    #[must_use]
    pub fn telegram_user_id(&self) -> &str {
        &self.telegram_user_id
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn current_level(&self) -> Option<ProficiencyLevel> {
        self.current_level
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn new_profile_has_no_level() {
        let profile =
            LearnerProfile::new(LearnerId::new(1), " 12345 ", Some("anna".into()), fixed_now())
                .unwrap();
        assert_eq!(profile.telegram_user_id(), "12345");
        assert_eq!(profile.current_level(), None);
        assert!(profile.is_active());
    }

    #[test]
    fn assessed_level_is_stored() {
        let now = fixed_now();
        let mut profile = LearnerProfile::new(LearnerId::new(1), "1", None, now).unwrap();
        let later = now + chrono::Duration::minutes(10);
        profile.apply_assessed_level(ProficiencyLevel::B2, later);
        assert_eq!(profile.current_level(), Some(ProficiencyLevel::B2));
        assert_eq!(profile.updated_at(), later);
    }

    #[test]
    fn blank_telegram_id_is_rejected() {
        let err = LearnerProfile::new(LearnerId::new(1), "  ", None, fixed_now()).unwrap_err();
        assert_eq!(err, LearnerError::EmptyTelegramId);
    }
}
