use std::sync::Arc;

use storage::repository::Storage;
use tutor_core::eligibility::SelectionPolicy;

use crate::Clock;
use crate::assessment::{AssessmentPlan, AssessmentService};
use crate::content_sync::ContentSyncService;
use crate::error::AppServicesError;
use crate::learner_service::LearnerService;
use crate::task_completion::TaskCompletionService;
use crate::task_delivery::TaskDeliveryService;

/// Tunables that shape the journeys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceSettings {
    pub plan: AssessmentPlan,
    pub selection: SelectionPolicy,
}

/// Assembles every service over one shared storage handle.
#[derive(Clone)]
pub struct AppServices {
    learners: Arc<LearnerService>,
    assessments: Arc<AssessmentService>,
    delivery: Arc<TaskDeliveryService>,
    completion: Arc<TaskCompletionService>,
    sync: Arc<ContentSyncService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: ServiceSettings) -> Self {
        let learners = Arc::new(LearnerService::new(clock, Arc::clone(&storage.learners)));
        let assessments = Arc::new(
            AssessmentService::new(
                clock,
                Arc::clone(&storage.learners),
                Arc::clone(&storage.assessments),
                Arc::clone(&storage.questions),
            )
            .with_plan(settings.plan),
        );
        let delivery = Arc::new(
            TaskDeliveryService::new(Arc::clone(&storage.learners), Arc::clone(&storage.tasks))
                .with_policy(settings.selection),
        );
        let completion = Arc::new(TaskCompletionService::new(
            clock,
            Arc::clone(&storage.learners),
            Arc::clone(&storage.tasks),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
        ));
        let sync = Arc::new(ContentSyncService::new(
            clock,
            Arc::clone(&storage.tasks),
            Arc::clone(&storage.questions),
        ));

        Self {
            learners,
            assessments,
            delivery,
            completion,
            sync,
        }
    }

    #[must_use]
    pub fn learners(&self) -> Arc<LearnerService> {
        Arc::clone(&self.learners)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn delivery(&self) -> Arc<TaskDeliveryService> {
        Arc::clone(&self.delivery)
    }

    #[must_use]
    pub fn completion(&self) -> Arc<TaskCompletionService> {
        Arc::clone(&self.completion)
    }

    #[must_use]
    pub fn sync(&self) -> Arc<ContentSyncService> {
        Arc::clone(&self.sync)
    }
}
