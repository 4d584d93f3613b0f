use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::model::ids::TaskId;
use crate::model::level::ProficiencyLevel;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("text task body cannot be empty")]
    EmptyBody,

    #[error("invalid media url {raw:?}")]
    InvalidMediaUrl { raw: String },

    #[error("unknown task type: {0:?}")]
    UnknownType(String),

    #[error("unknown task status: {0:?}")]
    UnknownStatus(String),
}

//
// ─── STATUS & TYPE ─────────────────────────────────────────────────────────────
//

/// Only published tasks are ever offered to learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Draft,
    Published,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Published => "published",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(TaskStatus::Draft),
            "published" => Ok(TaskStatus::Published),
            _ => Err(TaskError::UnknownStatus(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Text,
    Audio,
    Video,
}

impl TaskType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Text => "text",
            TaskType::Audio => "audio",
            TaskType::Video => "video",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(TaskType::Text),
            "audio" => Ok(TaskType::Audio),
            "video" => Ok(TaskType::Video),
            _ => Err(TaskError::UnknownType(s.to_owned())),
        }
    }
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// Task material. The variant decides the task type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskContent {
    Text(String),
    Audio(Url),
    Video(Url),
}

impl TaskContent {
    /// # Errors
    ///
    /// Returns `TaskError::EmptyBody` for blank text.
    pub fn text(body: impl Into<String>) -> Result<Self, TaskError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(TaskError::EmptyBody);
        }
        Ok(Self::Text(body))
    }

    /// # Errors
    ///
    /// Returns `TaskError::InvalidMediaUrl` unless `raw` is an http(s) URL.
    pub fn audio(raw: impl AsRef<str>) -> Result<Self, TaskError> {
        parse_media_url(raw.as_ref()).map(Self::Audio)
    }

    /// # Errors
    ///
    /// Returns `TaskError::InvalidMediaUrl` unless `raw` is an http(s) URL.
    pub fn video(raw: impl AsRef<str>) -> Result<Self, TaskError> {
        parse_media_url(raw.as_ref()).map(Self::Video)
    }

    #[must_use]
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskContent::Text(_) => TaskType::Text,
            TaskContent::Audio(_) => TaskType::Audio,
            TaskContent::Video(_) => TaskType::Video,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TaskContent::Text(body) => Some(body),
            _ => None,
        }
    }

    #[must_use]
    pub fn media_url(&self) -> Option<&Url> {
        match self {
            TaskContent::Audio(url) | TaskContent::Video(url) => Some(url),
            TaskContent::Text(_) => None,
        }
    }
}

fn parse_media_url(raw: &str) -> Result<Url, TaskError> {
    let invalid = || TaskError::InvalidMediaUrl {
        raw: raw.to_owned(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

//
// ─── TASK ──────────────────────────────────────────────────────────────────────
//

/// A leveled practice activity with follow-up questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    level: ProficiencyLevel,
    title: String,
    content: TaskContent,
    explanation: Option<String>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a draft task.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the title is blank.
    pub fn new(
        id: TaskId,
        level: ProficiencyLevel,
        title: impl Into<String>,
        content: TaskContent,
        explanation: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        Self::from_persisted(
            id,
            level,
            title,
            content,
            explanation,
            TaskStatus::Draft,
            now,
            now,
        )
    }

    /// Rehydrate a task from storage.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the title is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TaskId,
        level: ProficiencyLevel,
        title: impl Into<String>,
        content: TaskContent,
        explanation: Option<String>,
        status: TaskStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());
        Ok(Self {
            id,
            level,
            title,
            content,
            explanation,
            status,
            created_at,
            updated_at,
        })
    }

    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Published;
        self.updated_at = now;
    }

    pub fn unpublish(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Draft;
        self.updated_at = now;
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn level(&self) -> ProficiencyLevel {
        self.level
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &TaskContent {
        &self.content
    }

    #[must_use]
    pub fn task_type(&self) -> TaskType {
        self.content.task_type()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == TaskStatus::Published
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

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn content_variant_decides_type() {
        let text = TaskContent::text("Read this.").unwrap();
        let audio = TaskContent::audio("https://cdn.example.com/a.mp3").unwrap();
        let video = TaskContent::video("http://cdn.example.com/v.mp4").unwrap();

        assert_eq!(text.task_type(), TaskType::Text);
        assert_eq!(audio.task_type(), TaskType::Audio);
        assert_eq!(video.task_type(), TaskType::Video);
        assert!(text.media_url().is_none());
        assert_eq!(
            audio.media_url().map(Url::as_str),
            Some("https://cdn.example.com/a.mp3")
        );
    }

    #[test]
    fn rejects_blank_body_and_non_http_urls() {
        assert_eq!(TaskContent::text("   ").unwrap_err(), TaskError::EmptyBody);
        assert!(matches!(
            TaskContent::audio("file:///tmp/a.mp3"),
            Err(TaskError::InvalidMediaUrl { .. })
        ));
        assert!(matches!(
            TaskContent::video("not a url"),
            Err(TaskError::InvalidMediaUrl { .. })
        ));
    }

    #[test]
    fn new_task_starts_as_draft_and_publishes() {
        let now = fixed_now();
        let mut task = Task::new(
            TaskId::new(1),
            ProficiencyLevel::A2,
            " At the market ",
            TaskContent::text("Anna buys apples.").unwrap(),
            Some("  ".into()),
            now,
        )
        .unwrap();

        assert_eq!(task.title(), "At the market");
        assert_eq!(task.explanation(), None);
        assert!(!task.is_published());

        let later = now + chrono::Duration::hours(1);
        task.publish(later);
        assert!(task.is_published());
        assert_eq!(task.updated_at(), later);
        assert_eq!(task.created_at(), now);
    }

    #[test]
    fn status_and_type_parse_from_storage_strings() {
        assert_eq!("published".parse::<TaskStatus>().unwrap(), TaskStatus::Published);
        assert_eq!("VIDEO".parse::<TaskType>().unwrap(), TaskType::Video);
        assert!("archived".parse::<TaskStatus>().is_err());
    }
}
