use std::sync::Arc;

use storage::repository::{LearnerRepository, TaskRepository};
use tracing::{info, warn};
use tutor_core::eligibility::{self, SelectionPolicy};
use tutor_core::model::{LearnerId, ProficiencyLevel, Task, TaskType};

use crate::error::TaskDeliveryError;

/// Picks practice tasks around a learner's level.
#[derive(Clone)]
pub struct TaskDeliveryService {
    policy: SelectionPolicy,
    learners: Arc<dyn LearnerRepository>,
    tasks: Arc<dyn TaskRepository>,
}

impl TaskDeliveryService {
    #[must_use]
    pub fn new(learners: Arc<dyn LearnerRepository>, tasks: Arc<dyn TaskRepository>) -> Self {
        Self {
            policy: SelectionPolicy::default(),
            learners,
            tasks,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Published tasks at `level` and its neighbours, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `TaskDeliveryError::Level` when `level` is not a CEFR level.
    /// Returns `TaskDeliveryError::Storage` if repository access fails.
    pub async fn tasks_for_level(&self, level: &str) -> Result<Vec<Task>, TaskDeliveryError> {
        let levels = eligibility::eligible_levels_for(level)?;
        self.pool(&levels, None).await
    }

    /// Like [`Self::tasks_for_level`], restricted to one content type.
    ///
    /// # Errors
    ///
    /// Returns `TaskDeliveryError::Level` when `level` is not a CEFR level.
    /// Returns `TaskDeliveryError::Storage` if repository access fails.
    pub async fn tasks_for_level_and_type(
        &self,
        level: &str,
        task_type: TaskType,
    ) -> Result<Vec<Task>, TaskDeliveryError> {
        let levels = eligibility::eligible_levels_for(level)?;
        self.pool(&levels, Some(task_type)).await
    }

    /// One task for the learner, or `None` when nothing is eligible.
    ///
    /// # Errors
    ///
    /// Returns `LearnerNotFound` for an unknown learner, `NoLevel` before the first
    /// completed assessment, or `Storage`.
    pub async fn select_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Option<Task>, TaskDeliveryError> {
        let profile = self
            .learners
            .get_learner(learner)
            .await?
            .ok_or(TaskDeliveryError::LearnerNotFound(learner))?;
        let level = profile
            .current_level()
            .ok_or(TaskDeliveryError::NoLevel(learner))?;

        let pool = self
            .pool(&eligibility::eligible_levels(level), None)
            .await?;
        let Some(task) = eligibility::select_task(&pool, level, self.policy).cloned() else {
            warn!(learner_id = %learner, level = %level, "no tasks available");
            return Ok(None);
        };

        info!(
            learner_id = %learner,
            task_id = %task.id(),
            task_level = %task.level(),
            task_type = %task.task_type(),
            "task selected"
        );
        Ok(Some(task))
    }

    async fn pool(
        &self,
        levels: &[ProficiencyLevel],
        task_type: Option<TaskType>,
    ) -> Result<Vec<Task>, TaskDeliveryError> {
        let tasks = self.tasks.published_tasks(levels, task_type).await?;
        info!(
            levels = ?levels,
            task_type = ?task_type,
            count = tasks.len(),
            "tasks retrieved"
        );
        Ok(tasks)
    }
}
