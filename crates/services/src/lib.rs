#![forbid(unsafe_code)]

pub mod app_services;
pub mod assessment;
pub mod content_sync;
pub mod error;
pub mod learner_service;
pub mod task_completion;
pub mod task_delivery;

pub use tutor_core::Clock;
pub use tutor_core::eligibility::SelectionPolicy;

pub use app_services::{AppServices, ServiceSettings};
pub use assessment::{AssessmentPlan, AssessmentService, StartedAssessment};
pub use content_sync::{
    AssessmentQuestionDraft, ContentBundle, ContentSource, ContentSyncService, JsonFileSource,
    QuestionDraft, SyncStats, TaskDraft,
};
pub use error::{
    AppServicesError, AssessmentServiceError, LearnerServiceError, SyncError,
    TaskCompletionError, TaskDeliveryError,
};
pub use learner_service::LearnerService;
pub use task_completion::{CompletedTask, TaskCompletionService};
pub use task_delivery::TaskDeliveryService;
