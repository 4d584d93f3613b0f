use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tutor_core::model::{
    AssessmentId, AssessmentQuestion, AssessmentSession, AssessmentStatus, LearnerId,
    LearnerProfile, NewAssessment, ProficiencyLevel, QuestionId, Task, TaskId, TaskProgress,
    TaskQuestion, TaskType,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of opening a new assessment session.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedSession {
    pub session: AssessmentSession,
    /// The in-progress session that was abandoned to make room, if there was one.
    pub abandoned: Option<AssessmentId>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// Return the learner with this telegram id, creating a level-less profile if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for a blank telegram id, or other storage errors.
    async fn get_or_create_learner(
        &self,
        telegram_user_id: &str,
        username: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LearnerProfile, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_learner(&self, id: LearnerId) -> Result<Option<LearnerProfile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn find_by_telegram_id(
        &self,
        telegram_user_id: &str,
    ) -> Result<Option<LearnerProfile>, StorageError>;

    /// Persist profile changes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner does not exist.
    async fn save_learner(&self, learner: &LearnerProfile) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Abandon the learner's in-progress session (if any) and insert the new one as a
    /// single atomic step, so a learner never holds two in-progress sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a concurrent start for the same learner won
    /// the race.
    async fn start_assessment(&self, new: NewAssessment) -> Result<StartedSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<AssessmentSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn in_progress_for(
        &self,
        learner: LearnerId,
    ) -> Result<Option<AssessmentSession>, StorageError>;

    /// Persist answers and status of a session that is still in progress in the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist, or
    /// `StorageError::Conflict` if the stored session is already terminal.
    async fn save_assessment(&self, session: &AssessmentSession) -> Result<(), StorageError>;

    /// Persist a completed session and the learner's new level together.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session does not belong to the learner or
    /// the stored session is already terminal, `StorageError::NotFound` if either row is
    /// missing.
    async fn finish_assessment(
        &self,
        session: &AssessmentSession,
        learner: &LearnerProfile,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_assessment_question(
        &self,
        question: &AssessmentQuestion,
    ) -> Result<(), StorageError>;

    /// Every assessment question, ordered by level then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn list_assessment_questions(&self) -> Result<Vec<AssessmentQuestion>, StorageError>;

    /// Fetch assessment questions in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing.
    async fn get_assessment_questions(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AssessmentQuestion>, StorageError>;

    /// Replace a task's question list, returning how many questions were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a question belongs to another task.
    async fn replace_task_questions(
        &self,
        task_id: TaskId,
        questions: &[TaskQuestion],
    ) -> Result<usize, StorageError>;

    /// A task's questions in display order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn task_questions(&self, task_id: TaskId) -> Result<Vec<TaskQuestion>, StorageError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the task cannot be stored.
    async fn upsert_task(&self, task: &Task) -> Result<(), StorageError>;

    /// Upsert `task` and replace its question list in one atomic step, returning how many
    /// questions were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a question belongs to another task. Nothing is
    /// written in that case.
    async fn save_task_with_questions(
        &self,
        task: &Task,
        questions: &[TaskQuestion],
    ) -> Result<usize, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError>;

    /// Published tasks whose level is in `levels`, optionally of one type, by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn published_tasks(
        &self,
        levels: &[ProficiencyLevel],
        task_type: Option<TaskType>,
    ) -> Result<Vec<Task>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_progress(
        &self,
        learner: LearnerId,
        task: TaskId,
    ) -> Result<Option<TaskProgress>, StorageError>;

    /// Insert or overwrite the single record for (learner, task).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &TaskProgress) -> Result<(), StorageError>;

    /// A learner's records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn progress_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<TaskProgress>, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    learners: Arc<Mutex<HashMap<LearnerId, LearnerProfile>>>,
    assessments: Arc<Mutex<HashMap<AssessmentId, AssessmentSession>>>,
    assessment_questions: Arc<Mutex<HashMap<QuestionId, AssessmentQuestion>>>,
    task_questions: Arc<Mutex<HashMap<TaskId, Vec<TaskQuestion>>>>,
    tasks: Arc<Mutex<HashMap<TaskId, Task>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, TaskId), TaskProgress>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn next_id(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX - 1) + 1
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_task_questions(
    lists: &HashMap<TaskId, Vec<TaskQuestion>>,
    task_id: TaskId,
    questions: &[TaskQuestion],
) -> Result<(), StorageError> {
    let owned_elsewhere = lists
        .iter()
        .filter(|(owner, _)| **owner != task_id)
        .flat_map(|(_, list)| list)
        .any(|existing| questions.iter().any(|q| q.id() == existing.id()));
    if owned_elsewhere || questions.iter().any(|q| q.task_id() != task_id) {
        return Err(StorageError::Conflict);
    }
    Ok(())
}

fn put_task_questions(
    lists: &mut HashMap<TaskId, Vec<TaskQuestion>>,
    task_id: TaskId,
    questions: &[TaskQuestion],
) -> usize {
    let mut ordered = questions.to_vec();
    ordered.sort_by_key(|q| (q.order(), q.id()));
    lists.insert(task_id, ordered).map_or(0, |p| p.len())
}

#[async_trait]
impl LearnerRepository for InMemoryRepository {
    async fn get_or_create_learner(
        &self,
        telegram_user_id: &str,
        username: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LearnerProfile, StorageError> {
        let mut guard = lock(&self.learners)?;
        let telegram_user_id = telegram_user_id.trim();
        if let Some(existing) = guard
            .values()
            .find(|l| l.telegram_user_id() == telegram_user_id)
        {
            return Ok(existing.clone());
        }

        let id = LearnerId::new(next_id(guard.len()));
        let learner =
            LearnerProfile::new(id, telegram_user_id, username.map(str::to_owned), now)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.insert(id, learner.clone());
        Ok(learner)
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Option<LearnerProfile>, StorageError> {
        Ok(lock(&self.learners)?.get(&id).cloned())
    }

    async fn find_by_telegram_id(
        &self,
        telegram_user_id: &str,
    ) -> Result<Option<LearnerProfile>, StorageError> {
        let telegram_user_id = telegram_user_id.trim();
        Ok(lock(&self.learners)?
            .values()
            .find(|l| l.telegram_user_id() == telegram_user_id)
            .cloned())
    }

    async fn save_learner(&self, learner: &LearnerProfile) -> Result<(), StorageError> {
        let mut guard = lock(&self.learners)?;
        let slot = guard.get_mut(&learner.id()).ok_or(StorageError::NotFound)?;
        *slot = learner.clone();
        Ok(())
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn start_assessment(&self, new: NewAssessment) -> Result<StartedSession, StorageError> {
        // The single guard makes abandon + insert atomic for this adapter.
        let mut guard = lock(&self.assessments)?;

        let mut abandoned = None;
        if let Some(existing) = guard.values_mut().find(|s| {
            s.learner_id() == new.learner_id && s.status() == AssessmentStatus::InProgress
        }) {
            existing
                .abandon()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            abandoned = Some(existing.id());
        }

        let id = AssessmentId::new(next_id(guard.len()));
        let session = new.assign_id(id);
        guard.insert(id, session.clone());

        Ok(StartedSession { session, abandoned })
    }

    async fn get_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        Ok(lock(&self.assessments)?.get(&id).cloned())
    }

    async fn in_progress_for(
        &self,
        learner: LearnerId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        Ok(lock(&self.assessments)?
            .values()
            .find(|s| s.learner_id() == learner && s.status() == AssessmentStatus::InProgress)
            .cloned())
    }

    async fn save_assessment(&self, session: &AssessmentSession) -> Result<(), StorageError> {
        let mut guard = lock(&self.assessments)?;
        let duplicate_in_progress = session.status() == AssessmentStatus::InProgress
            && guard.values().any(|s| {
                s.id() != session.id()
                    && s.learner_id() == session.learner_id()
                    && s.status() == AssessmentStatus::InProgress
            });
        if duplicate_in_progress {
            return Err(StorageError::Conflict);
        }
        let slot = guard.get_mut(&session.id()).ok_or(StorageError::NotFound)?;
        if slot.status() != AssessmentStatus::InProgress {
            return Err(StorageError::Conflict);
        }
        *slot = session.clone();
        Ok(())
    }

    async fn finish_assessment(
        &self,
        session: &AssessmentSession,
        learner: &LearnerProfile,
    ) -> Result<(), StorageError> {
        if session.learner_id() != learner.id() {
            return Err(StorageError::Conflict);
        }
        let mut sessions = lock(&self.assessments)?;
        let mut learners = lock(&self.learners)?;

        if !learners.contains_key(&learner.id()) {
            return Err(StorageError::NotFound);
        }
        let slot = sessions
            .get_mut(&session.id())
            .ok_or(StorageError::NotFound)?;
        if slot.status() != AssessmentStatus::InProgress {
            return Err(StorageError::Conflict);
        }
        *slot = session.clone();
        learners.insert(learner.id(), learner.clone());
        Ok(())
    }
}

#[async_trait]
impl QuestionBank for InMemoryRepository {
    async fn upsert_assessment_question(
        &self,
        question: &AssessmentQuestion,
    ) -> Result<(), StorageError> {
        lock(&self.assessment_questions)?.insert(question.id(), question.clone());
        Ok(())
    }

    async fn list_assessment_questions(&self) -> Result<Vec<AssessmentQuestion>, StorageError> {
        let mut all: Vec<AssessmentQuestion> =
            lock(&self.assessment_questions)?.values().cloned().collect();
        all.sort_by_key(|q| (q.level(), q.id()));
        Ok(all)
    }

    async fn get_assessment_questions(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AssessmentQuestion>, StorageError> {
        let guard = lock(&self.assessment_questions)?;
        ids.iter()
            .map(|id| guard.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn replace_task_questions(
        &self,
        task_id: TaskId,
        questions: &[TaskQuestion],
    ) -> Result<usize, StorageError> {
        let mut guard = lock(&self.task_questions)?;
        check_task_questions(&guard, task_id, questions)?;
        Ok(put_task_questions(&mut guard, task_id, questions))
    }

    async fn task_questions(&self, task_id: TaskId) -> Result<Vec<TaskQuestion>, StorageError> {
        Ok(lock(&self.task_questions)?
            .get(&task_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn upsert_task(&self, task: &Task) -> Result<(), StorageError> {
        lock(&self.tasks)?.insert(task.id(), task.clone());
        Ok(())
    }

    async fn save_task_with_questions(
        &self,
        task: &Task,
        questions: &[TaskQuestion],
    ) -> Result<usize, StorageError> {
        let mut tasks = lock(&self.tasks)?;
        let mut lists = lock(&self.task_questions)?;
        check_task_questions(&lists, task.id(), questions)?;
        tasks.insert(task.id(), task.clone());
        Ok(put_task_questions(&mut lists, task.id(), questions))
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        Ok(lock(&self.tasks)?.get(&id).cloned())
    }

    async fn published_tasks(
        &self,
        levels: &[ProficiencyLevel],
        task_type: Option<TaskType>,
    ) -> Result<Vec<Task>, StorageError> {
        let mut found: Vec<Task> = lock(&self.tasks)?
            .values()
            .filter(|t| t.is_published() && levels.contains(&t.level()))
            .filter(|t| task_type.is_none_or(|kind| t.task_type() == kind))
            .cloned()
            .collect();
        found.sort_by_key(Task::id);
        Ok(found)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        task: TaskId,
    ) -> Result<Option<TaskProgress>, StorageError> {
        Ok(lock(&self.progress)?.get(&(learner, task)).cloned())
    }

    async fn upsert_progress(&self, progress: &TaskProgress) -> Result<(), StorageError> {
        lock(&self.progress)?.insert((progress.learner_id, progress.task_id), progress.clone());
        Ok(())
    }

    async fn progress_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<TaskProgress>, StorageError> {
        let mut records: Vec<TaskProgress> = lock(&self.progress)?
            .values()
            .filter(|p| p.learner_id == learner)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then(b.task_id.cmp(&a.task_id))
        });
        Ok(records)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub learners: Arc<dyn LearnerRepository>,
    pub assessments: Arc<dyn AssessmentRepository>,
    pub questions: Arc<dyn QuestionBank>,
    pub tasks: Arc<dyn TaskRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            learners: Arc::new(repo.clone()),
            assessments: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            tasks: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::{AnswerSet, ScorableQuestion, TaskContent};
    use tutor_core::scoring::WeightedScore;
    use tutor_core::time::fixed_now;

    fn new_assessment(learner: LearnerId) -> NewAssessment {
        NewAssessment::new(
            learner,
            vec![ScorableQuestion::new(QuestionId::new(1), 1.0, 0)],
            fixed_now(),
        )
    }

    fn published(id: u64, level: ProficiencyLevel, content: TaskContent) -> Task {
        let mut task =
            Task::new(TaskId::new(id), level, format!("T{id}"), content, None, fixed_now())
                .unwrap();
        task.publish(fixed_now());
        task
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let repo = InMemoryRepository::new();
        let a = repo
            .get_or_create_learner("100", Some("anna"), fixed_now())
            .await
            .unwrap();
        let b = repo
            .get_or_create_learner(" 100 ", None, fixed_now())
            .await
            .unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(b.username(), Some("anna"));

        let other = repo
            .get_or_create_learner("200", None, fixed_now())
            .await
            .unwrap();
        assert_ne!(other.id(), a.id());
    }

    #[tokio::test]
    async fn starting_twice_abandons_the_first_session() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new(1);

        let first = repo.start_assessment(new_assessment(learner)).await.unwrap();
        assert_eq!(first.abandoned, None);

        let second = repo.start_assessment(new_assessment(learner)).await.unwrap();
        assert_eq!(second.abandoned, Some(first.session.id()));

        let old = repo
            .get_assessment(first.session.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.status(), AssessmentStatus::Abandoned);

        let current = repo.in_progress_for(learner).await.unwrap().unwrap();
        assert_eq!(current.id(), second.session.id());
    }

    #[tokio::test]
    async fn stale_copy_cannot_revive_an_abandoned_session() {
        let repo = InMemoryRepository::new();
        let mut learner = repo
            .get_or_create_learner("300", None, fixed_now())
            .await
            .unwrap();
        let first = repo
            .start_assessment(new_assessment(learner.id()))
            .await
            .unwrap();
        let mut stale = first.session.clone();
        repo.start_assessment(new_assessment(learner.id()))
            .await
            .unwrap();

        let mut answering = stale.clone();
        answering.record_answer(QuestionId::new(1), 0).unwrap();
        assert!(matches!(
            repo.save_assessment(&answering).await,
            Err(StorageError::Conflict)
        ));

        let outcome = stale.complete(fixed_now()).unwrap();
        learner.apply_assessed_level(outcome.level, fixed_now());
        assert!(matches!(
            repo.finish_assessment(&stale, &learner).await,
            Err(StorageError::Conflict)
        ));

        let stored = repo
            .get_assessment(first.session.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status(), AssessmentStatus::Abandoned);
        let profile = repo.get_learner(learner.id()).await.unwrap().unwrap();
        assert_eq!(profile.current_level(), None);
    }

    #[tokio::test]
    async fn sessions_of_other_learners_are_untouched() {
        let repo = InMemoryRepository::new();
        let a = repo
            .start_assessment(new_assessment(LearnerId::new(1)))
            .await
            .unwrap();
        let b = repo
            .start_assessment(new_assessment(LearnerId::new(2)))
            .await
            .unwrap();
        assert_eq!(b.abandoned, None);
        assert!(repo.in_progress_for(LearnerId::new(1)).await.unwrap().is_some());
        assert_ne!(a.session.id(), b.session.id());
    }

    #[tokio::test]
    async fn published_tasks_filter_by_level_status_and_type() {
        let repo = InMemoryRepository::new();
        repo.upsert_task(&published(
            1,
            ProficiencyLevel::B1,
            TaskContent::text("x").unwrap(),
        ))
        .await
        .unwrap();
        repo.upsert_task(&published(
            2,
            ProficiencyLevel::B1,
            TaskContent::audio("https://a.example/x.mp3").unwrap(),
        ))
        .await
        .unwrap();
        repo.upsert_task(&published(
            3,
            ProficiencyLevel::C2,
            TaskContent::text("x").unwrap(),
        ))
        .await
        .unwrap();
        let draft = Task::new(
            TaskId::new(4),
            ProficiencyLevel::B1,
            "draft",
            TaskContent::text("x").unwrap(),
            None,
            fixed_now(),
        )
        .unwrap();
        repo.upsert_task(&draft).await.unwrap();

        let levels = [ProficiencyLevel::A2, ProficiencyLevel::B1, ProficiencyLevel::B2];
        let all = repo.published_tasks(&levels, None).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.id().value()).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let audio = repo
            .published_tasks(&levels, Some(TaskType::Audio))
            .await
            .unwrap();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].id(), TaskId::new(2));
    }

    #[tokio::test]
    async fn progress_upsert_keeps_one_record_per_pair() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new(1);
        let task = TaskId::new(9);
        let first = TaskProgress::record(
            learner,
            task,
            AnswerSet::new(),
            WeightedScore {
                earned: 0.0,
                total: 1.0,
            },
            fixed_now(),
        );
        repo.upsert_progress(&first).await.unwrap();

        let mut second = first.clone();
        second.resubmit(
            AnswerSet::new(),
            WeightedScore {
                earned: 1.0,
                total: 1.0,
            },
            fixed_now(),
        );
        repo.upsert_progress(&second).await.unwrap();

        let all = repo.progress_for_learner(learner).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].percentage_correct, 100.0);
    }

    #[tokio::test]
    async fn task_questions_come_back_in_display_order() {
        let repo = InMemoryRepository::new();
        let task = TaskId::new(1);
        let q = |id: u64, order: u32| {
            TaskQuestion::new(
                QuestionId::new(id),
                task,
                format!("Q{id}"),
                vec!["a".into(), "b".into()],
                0,
                1.0,
                order,
            )
            .unwrap()
        };
        let removed = repo
            .replace_task_questions(task, &[q(1, 2), q(2, 1)])
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let ordered = repo.task_questions(task).await.unwrap();
        assert_eq!(ordered[0].id(), QuestionId::new(2));

        let removed = repo.replace_task_questions(task, &[q(3, 1)]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(repo.task_questions(task).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn question_ids_cannot_move_between_tasks() {
        let repo = InMemoryRepository::new();
        let question = |task: u64| {
            TaskQuestion::new(
                QuestionId::new(7),
                TaskId::new(task),
                "Q",
                vec!["a".into(), "b".into()],
                0,
                1.0,
                1,
            )
            .unwrap()
        };
        repo.replace_task_questions(TaskId::new(1), &[question(1)])
            .await
            .unwrap();
        assert!(matches!(
            repo.replace_task_questions(TaskId::new(2), &[question(2)]).await,
            Err(StorageError::Conflict)
        ));
        assert!(repo.task_questions(TaskId::new(2)).await.unwrap().is_empty());
    }
}
