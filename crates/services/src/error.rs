//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutor_core::model::{
    AssessmentError, AssessmentId, InvalidLevelError, LearnerError, LearnerId, TaskId,
};

/// Errors emitted by `LearnerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearnerServiceError {
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AssessmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentServiceError {
    #[error("learner {0} not found")]
    LearnerNotFound(LearnerId),
    #[error("assessment {0} not found")]
    SessionNotFound(AssessmentId),
    #[error("question bank is empty")]
    NoQuestions,
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TaskDeliveryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskDeliveryError {
    #[error("learner {0} not found")]
    LearnerNotFound(LearnerId),
    #[error("learner {0} has not been assessed yet")]
    NoLevel(LearnerId),
    #[error(transparent)]
    Level(#[from] InvalidLevelError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TaskCompletionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskCompletionError {
    #[error("learner {0} not found")]
    LearnerNotFound(LearnerId),
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("task {0} has no questions")]
    NoQuestions(TaskId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentSyncService` and content sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("failed to read content source: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed content: {0}")]
    Format(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping the service bundle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
