use std::sync::Arc;

use storage::repository::{LearnerRepository, ProgressRepository, QuestionBank, TaskRepository};
use tracing::info;
use tutor_core::model::{AnswerSet, LearnerId, TaskId, TaskProgress, TaskQuestion};
use tutor_core::scoring::{self, WeightedScore};

use crate::Clock;
use crate::error::TaskCompletionError;

/// Feedback for one task submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTask {
    pub progress: TaskProgress,
    pub weighted: WeightedScore,
    /// False when an earlier submission for the same task was overwritten.
    pub created: bool,
}

/// Scores task submissions and keeps one progress record per learner and task.
#[derive(Clone)]
pub struct TaskCompletionService {
    clock: Clock,
    learners: Arc<dyn LearnerRepository>,
    tasks: Arc<dyn TaskRepository>,
    questions: Arc<dyn QuestionBank>,
    progress: Arc<dyn ProgressRepository>,
}

impl TaskCompletionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        learners: Arc<dyn LearnerRepository>,
        tasks: Arc<dyn TaskRepository>,
        questions: Arc<dyn QuestionBank>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            learners,
            tasks,
            questions,
            progress,
        }
    }

    /// A task's follow-up questions in display order.
    ///
    /// # Errors
    ///
    /// Returns `TaskCompletionError::Storage` if repository access fails.
    pub async fn questions(
        &self,
        task: TaskId,
    ) -> Result<Vec<TaskQuestion>, TaskCompletionError> {
        Ok(self.questions.task_questions(task).await?)
    }

    /// Score `answers` against the task's questions and upsert the learner's progress.
    ///
    /// # Errors
    ///
    /// Returns `LearnerNotFound`, `TaskNotFound`, `NoQuestions` when the task has no
    /// follow-up questions, or `Storage`.
    pub async fn complete_task(
        &self,
        learner: LearnerId,
        task: TaskId,
        answers: AnswerSet,
        time_taken_secs: Option<f64>,
    ) -> Result<CompletedTask, TaskCompletionError> {
        if self.learners.get_learner(learner).await?.is_none() {
            return Err(TaskCompletionError::LearnerNotFound(learner));
        }
        if self.tasks.get_task(task).await?.is_none() {
            return Err(TaskCompletionError::TaskNotFound(task));
        }

        let questions = self.questions.task_questions(task).await?;
        if questions.is_empty() {
            return Err(TaskCompletionError::NoQuestions(task));
        }
        let scorable: Vec<_> = questions.iter().map(TaskQuestion::scorable).collect();
        let weighted = scoring::tally(&scorable, &answers);

        let now = self.clock.now();
        let (progress, created) = match self.progress.get_progress(learner, task).await? {
            Some(mut existing) => {
                existing.resubmit(answers, weighted, now);
                (existing.with_time_taken(time_taken_secs), false)
            }
            None => (
                TaskProgress::record(learner, task, answers, weighted, now)
                    .with_time_taken(time_taken_secs),
                true,
            ),
        };
        self.progress.upsert_progress(&progress).await?;

        info!(
            learner_id = %learner,
            task_id = %task,
            score = progress.score,
            percentage = progress.percentage_correct,
            created,
            "task completed"
        );
        Ok(CompletedTask {
            progress,
            weighted,
            created,
        })
    }

    /// The learner's submissions, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `TaskCompletionError::Storage` if repository access fails.
    pub async fn history(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<TaskProgress>, TaskCompletionError> {
        Ok(self.progress.progress_for_learner(learner).await?)
    }
}
