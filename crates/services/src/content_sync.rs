//! Pulls authored content from an external source into the stores.
//!
//! Sources hand over loosely typed drafts (strings for levels and types, optional
//! weights). Each draft is validated into a domain record; a draft that fails
//! validation is counted as rejected and skipped, and the rest of the batch continues.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use storage::repository::{QuestionBank, StorageError, TaskRepository};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tutor_core::model::{
    AssessmentQuestion, ProficiencyLevel, QuestionId, ScorableQuestion, SkillType, Task,
    TaskContent, TaskId, TaskQuestion, TaskType,
};

use crate::Clock;
use crate::error::SyncError;

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionDraft {
    pub id: u64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    /// Display position; defaults to the draft's position in the list.
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskDraft {
    pub id: u64,
    pub level: String,
    pub title: String,
    pub task_type: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssessmentQuestionDraft {
    pub id: u64,
    pub level: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub skill: Option<String>,
}

/// Everything a source delivers in one pull.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentBundle {
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
    #[serde(default)]
    pub assessment_questions: Vec<AssessmentQuestionDraft>,
}

//
// ─── SOURCES ───────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `SyncError` if the source cannot be read or parsed.
    async fn fetch(&self) -> Result<ContentBundle, SyncError>;
}

/// Reads a JSON-encoded [`ContentBundle`] from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContentSource for JsonFileSource {
    async fn fetch(&self) -> Result<ContentBundle, SyncError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl ContentSource for ContentBundle {
    async fn fetch(&self) -> Result<ContentBundle, SyncError> {
        Ok(self.clone())
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Counts from one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub tasks_created: usize,
    pub tasks_updated: usize,
    pub questions_written: usize,
    pub rejected: usize,
}

#[derive(Clone)]
pub struct ContentSyncService {
    clock: Clock,
    tasks: Arc<dyn TaskRepository>,
    questions: Arc<dyn QuestionBank>,
}

impl ContentSyncService {
    #[must_use]
    pub fn new(
        clock: Clock,
        tasks: Arc<dyn TaskRepository>,
        questions: Arc<dyn QuestionBank>,
    ) -> Self {
        Self {
            clock,
            tasks,
            questions,
        }
    }

    /// Upsert every valid task and assessment question from `source`.
    ///
    /// Tasks missing from the source are left as they are. A task and its questions are
    /// written together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the source fails or a store write fails. Invalid drafts
    /// are not errors; they show up in `SyncStats::rejected`.
    pub async fn sync(&self, source: &dyn ContentSource) -> Result<SyncStats, SyncError> {
        let bundle = source.fetch().await?;
        let mut stats = SyncStats::default();

        for draft in bundle.assessment_questions {
            let id = draft.id;
            match assessment_question_from_draft(draft) {
                Ok(question) => {
                    self.questions.upsert_assessment_question(&question).await?;
                    stats.questions_written += 1;
                }
                Err(reason) => {
                    warn!(question_id = id, %reason, "rejected assessment question");
                    stats.rejected += 1;
                }
            }
        }

        for draft in bundle.tasks {
            let id = TaskId::new(draft.id);
            let existing = self.tasks.get_task(id).await?;
            let (task, questions) = match self.task_from_draft(draft, existing.as_ref()) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    warn!(task_id = %id, %reason, "rejected task");
                    stats.rejected += 1;
                    continue;
                }
            };

            if task.is_published() && questions.is_empty() {
                warn!(task_id = %id, "rejected published task without questions");
                stats.rejected += 1;
                continue;
            }
            match self.tasks.save_task_with_questions(&task, &questions).await {
                Ok(_) => {}
                Err(StorageError::Conflict) => {
                    warn!(task_id = %id, "rejected task reusing another task's question id");
                    stats.rejected += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            stats.questions_written += questions.len();
            if existing.is_some() {
                stats.tasks_updated += 1;
            } else {
                stats.tasks_created += 1;
            }
        }

        info!(
            tasks_created = stats.tasks_created,
            tasks_updated = stats.tasks_updated,
            questions_written = stats.questions_written,
            rejected = stats.rejected,
            "content sync finished"
        );
        Ok(stats)
    }

    /// Run [`Self::sync`] every `period`, starting immediately, until `shutdown`
    /// resolves. A failed round is logged and the next one still runs. Returns the
    /// number of rounds started.
    pub async fn sync_every(
        &self,
        source: &dyn ContentSource,
        period: Duration,
        shutdown: impl Future<Output = ()>,
    ) -> usize {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut rounds = 0;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    rounds += 1;
                    if let Err(err) = self.sync(source).await {
                        error!(round = rounds, error = %err, "scheduled content sync failed");
                    }
                }
            }
        }
        info!(rounds, "content sync schedule stopped");
        rounds
    }

    fn task_from_draft(
        &self,
        draft: TaskDraft,
        existing: Option<&Task>,
    ) -> Result<(Task, Vec<TaskQuestion>), tutor_core::Error> {
        let id = TaskId::new(draft.id);
        let level: ProficiencyLevel = draft.level.parse()?;
        let content = match draft.task_type.parse::<TaskType>()? {
            TaskType::Text => TaskContent::text(draft.body.unwrap_or_default())?,
            TaskType::Audio => TaskContent::audio(draft.media_url.unwrap_or_default())?,
            TaskType::Video => TaskContent::video(draft.media_url.unwrap_or_default())?,
        };

        let now = self.clock.now();
        let mut task = Task::new(id, level, draft.title, content, draft.explanation, now)?;
        if let Some(previous) = existing {
            task = Task::from_persisted(
                id,
                task.level(),
                task.title(),
                task.content().clone(),
                task.explanation().map(str::to_owned),
                previous.status(),
                previous.created_at(),
                now,
            )?;
        }
        if draft.published {
            task.publish(now);
        } else {
            task.unpublish(now);
        }

        let mut questions = Vec::with_capacity(draft.questions.len());
        for (position, q) in (1u32..).zip(draft.questions) {
            questions.push(TaskQuestion::new(
                QuestionId::new(q.id),
                id,
                q.text,
                q.options,
                q.correct_answer,
                q.weight.unwrap_or(ScorableQuestion::DEFAULT_WEIGHT),
                q.order.unwrap_or(position),
            )?);
        }
        Ok((task, questions))
    }
}

fn assessment_question_from_draft(
    draft: AssessmentQuestionDraft,
) -> Result<AssessmentQuestion, tutor_core::Error> {
    let skill = draft
        .skill
        .as_deref()
        .map(str::parse::<SkillType>)
        .transpose()?;
    Ok(AssessmentQuestion::new(
        QuestionId::new(draft.id),
        draft.level.parse()?,
        draft.text,
        draft.options,
        draft.correct_answer,
        draft.weight.unwrap_or(ScorableQuestion::DEFAULT_WEIGHT),
        skill,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use tutor_core::time::fixed_clock;

    fn bundle() -> ContentBundle {
        serde_json::from_str(
            r#"{
                "assessment_questions": [
                    {"id": 1, "level": "a1", "text": "Pick b", "options": ["a", "b"],
                     "correct_answer": 1, "skill": "grammar"},
                    {"id": 2, "level": "Z9", "text": "Bad level", "options": ["a", "b"],
                     "correct_answer": 0}
                ],
                "tasks": [
                    {"id": 10, "level": "B1", "title": "Story", "task_type": "text",
                     "body": "Once upon a time", "published": true,
                     "questions": [
                        {"id": 100, "text": "Who?", "options": ["x", "y"], "correct_answer": 0},
                        {"id": 101, "text": "When?", "options": ["x", "y"], "correct_answer": 1,
                         "weight": 2.0}
                     ]},
                    {"id": 11, "level": "B1", "title": "Podcast", "task_type": "audio",
                     "media_url": "ftp://nope"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn service(repo: &InMemoryRepository) -> ContentSyncService {
        ContentSyncService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn valid_rows_are_written_and_invalid_rows_counted() {
        let repo = InMemoryRepository::new();
        let stats = service(&repo).sync(&bundle()).await.unwrap();
        assert_eq!(
            stats,
            SyncStats {
                tasks_created: 1,
                tasks_updated: 0,
                questions_written: 3,
                rejected: 2,
            }
        );

        let task = repo.get_task(TaskId::new(10)).await.unwrap().unwrap();
        assert!(task.is_published());
        let questions = repo.task_questions(TaskId::new(10)).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].order(), 2);
        assert_eq!(questions[1].weight(), 2.0);

        let bank = repo.list_assessment_questions().await.unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank[0].skill(), Some(SkillType::Grammar));
    }

    #[tokio::test]
    async fn second_sync_updates_and_keeps_created_at() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        svc.sync(&bundle()).await.unwrap();
        let created = repo.get_task(TaskId::new(10)).await.unwrap().unwrap();

        let mut changed = bundle();
        changed.tasks[0].title = "Story, revised".into();
        changed.tasks[0].published = false;
        changed.tasks[0].questions.pop();
        let stats = svc.sync(&changed).await.unwrap();
        assert_eq!(stats.tasks_updated, 1);
        assert_eq!(stats.tasks_created, 0);

        let task = repo.get_task(TaskId::new(10)).await.unwrap().unwrap();
        assert_eq!(task.title(), "Story, revised");
        assert!(!task.is_published());
        assert_eq!(task.created_at(), created.created_at());
        assert_eq!(repo.task_questions(TaskId::new(10)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clashing_question_ids_reject_the_draft_and_sync_continues() {
        let repo = InMemoryRepository::new();
        let bundle: ContentBundle = serde_json::from_str(
            r#"{
                "tasks": [
                    {"id": 10, "level": "B1", "title": "First", "task_type": "text",
                     "body": "a", "published": true,
                     "questions": [{"id": 100, "text": "?", "options": ["x", "y"],
                                    "correct_answer": 0}]},
                    {"id": 11, "level": "B1", "title": "Clash", "task_type": "text",
                     "body": "b", "published": true,
                     "questions": [{"id": 100, "text": "?", "options": ["x", "y"],
                                    "correct_answer": 1}]},
                    {"id": 12, "level": "B1", "title": "Empty", "task_type": "text",
                     "body": "c", "published": true},
                    {"id": 13, "level": "B1", "title": "Later", "task_type": "text",
                     "body": "d", "published": true,
                     "questions": [{"id": 130, "text": "?", "options": ["x", "y"],
                                    "correct_answer": 0}]}
                ]
            }"#,
        )
        .unwrap();

        let stats = service(&repo).sync(&bundle).await.unwrap();
        assert_eq!(stats.tasks_created, 2);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.questions_written, 2);

        assert!(repo.get_task(TaskId::new(11)).await.unwrap().is_none());
        assert!(repo.get_task(TaskId::new(12)).await.unwrap().is_none());
        assert!(repo.get_task(TaskId::new(13)).await.unwrap().is_some());
        let kept = repo.task_questions(TaskId::new(10)).await.unwrap();
        assert_eq!(kept[0].correct_answer(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_sync_runs_each_period_until_shutdown() {
        let repo = InMemoryRepository::new();
        let rounds = service(&repo)
            .sync_every(
                &bundle(),
                Duration::from_secs(60),
                tokio::time::sleep(Duration::from_secs(150)),
            )
            .await;
        assert_eq!(rounds, 3);
        assert!(repo.get_task(TaskId::new(10)).await.unwrap().is_some());
    }

    struct Offline;

    #[async_trait]
    impl ContentSource for Offline {
        async fn fetch(&self) -> Result<ContentBundle, SyncError> {
            Err(std::io::Error::other("sheet unreachable").into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_sync_survives_a_failing_source() {
        let repo = InMemoryRepository::new();
        let rounds = service(&repo)
            .sync_every(
                &Offline,
                Duration::from_secs(10),
                tokio::time::sleep(Duration::from_secs(25)),
            )
            .await;
        assert_eq!(rounds, 3);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = JsonFileSource::new("/definitely/not/here.json")
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
