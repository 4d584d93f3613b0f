use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tutor_core::model::{
    AnswerSet, AssessmentId, AssessmentQuestion, AssessmentSession, AssessmentStatus, LearnerId,
    LearnerProfile, ProficiencyLevel, QuestionId, ScorableQuestion, SkillType, Task, TaskContent,
    TaskId, TaskProgress, TaskQuestion, TaskStatus, TaskType,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a driver error, turning unique-constraint violations into `Conflict`.
/// SQLite result codes for a write that lost to a concurrent writer: `SQLITE_BUSY`,
/// `SQLITE_LOCKED`, `SQLITE_LOCKED_SHAREDCACHE` and `SQLITE_BUSY_SNAPSHOT`.
const CONTENDED_CODES: [&str; 4] = ["5", "6", "262", "517"];

pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    let contended = e.as_database_error().is_some_and(|d| {
        d.is_unique_violation()
            || d.code().is_some_and(|code| CONTENDED_CODES.contains(&code.as_ref()))
    });
    if contended {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn learner_id_from_i64(v: i64) -> Result<LearnerId, StorageError> {
    Ok(LearnerId::new(i64_to_u64("learner_id", v)?))
}

pub(crate) fn task_id_from_i64(v: i64) -> Result<TaskId, StorageError> {
    Ok(TaskId::new(i64_to_u64("task_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn assessment_id_from_i64(v: i64) -> Result<AssessmentId, StorageError> {
    Ok(AssessmentId::new(i64_to_u64("assessment_id", v)?))
}

fn parse_level(raw: &str) -> Result<ProficiencyLevel, StorageError> {
    raw.parse().map_err(ser)
}

//
// ─── JSON COLUMNS ──────────────────────────────────────────────────────────────
//

#[derive(Serialize, Deserialize)]
struct AnswerEntry {
    question_id: QuestionId,
    option: u32,
}

pub(crate) fn encode_options(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

fn decode_options(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

/// Answers are stored as a list of `{question_id, option}` objects.
pub(crate) fn encode_answers(answers: &AnswerSet) -> Result<String, StorageError> {
    let entries: Vec<AnswerEntry> = answers
        .iter()
        .map(|(question_id, option)| AnswerEntry {
            question_id,
            option,
        })
        .collect();
    serde_json::to_string(&entries).map_err(ser)
}

fn decode_answers(raw: &str) -> Result<AnswerSet, StorageError> {
    let entries: Vec<AnswerEntry> = serde_json::from_str(raw).map_err(ser)?;
    Ok(entries
        .into_iter()
        .map(|e| (e.question_id, e.option))
        .collect())
}

pub(crate) fn encode_snapshot(questions: &[ScorableQuestion]) -> Result<String, StorageError> {
    serde_json::to_string(questions).map_err(ser)
}

fn decode_snapshot(raw: &str) -> Result<Vec<ScorableQuestion>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

pub(crate) fn map_learner_row(row: &SqliteRow) -> Result<LearnerProfile, StorageError> {
    let current_level = row
        .try_get::<Option<String>, _>("current_level")
        .map_err(ser)?
        .map(|raw| parse_level(&raw))
        .transpose()?;

    LearnerProfile::from_persisted(
        learner_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("telegram_user_id").map_err(ser)?,
        row.try_get::<Option<String>, _>("username").map_err(ser)?,
        current_level,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_assessment_question_row(
    row: &SqliteRow,
) -> Result<AssessmentQuestion, StorageError> {
    let level: String = row.try_get("level").map_err(ser)?;
    let options: String = row.try_get("options").map_err(ser)?;
    let skill = row
        .try_get::<Option<String>, _>("skill")
        .map_err(ser)?
        .map(|raw| raw.parse::<SkillType>().map_err(ser))
        .transpose()?;

    AssessmentQuestion::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        parse_level(&level)?,
        row.try_get::<String, _>("text").map_err(ser)?,
        decode_options(&options)?,
        i64_to_u32(
            "correct_answer",
            row.try_get::<i64, _>("correct_answer").map_err(ser)?,
        )?,
        row.try_get("weight").map_err(ser)?,
        skill,
    )
    .map_err(ser)
}

pub(crate) fn map_task_question_row(row: &SqliteRow) -> Result<TaskQuestion, StorageError> {
    let options: String = row.try_get("options").map_err(ser)?;

    TaskQuestion::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        task_id_from_i64(row.try_get::<i64, _>("task_id").map_err(ser)?)?,
        row.try_get::<String, _>("text").map_err(ser)?,
        decode_options(&options)?,
        i64_to_u32(
            "correct_answer",
            row.try_get::<i64, _>("correct_answer").map_err(ser)?,
        )?,
        row.try_get("weight").map_err(ser)?,
        i64_to_u32(
            "display_order",
            row.try_get::<i64, _>("display_order").map_err(ser)?,
        )?,
    )
    .map_err(ser)
}

pub(crate) fn map_task_row(row: &SqliteRow) -> Result<Task, StorageError> {
    let level: String = row.try_get("level").map_err(ser)?;
    let task_type: TaskType = row
        .try_get::<String, _>("task_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let status: TaskStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let content = match task_type {
        TaskType::Text => {
            let body = row
                .try_get::<Option<String>, _>("body")
                .map_err(ser)?
                .ok_or_else(|| StorageError::Serialization("missing body".into()))?;
            TaskContent::text(body)
        }
        TaskType::Audio | TaskType::Video => {
            let url = row
                .try_get::<Option<String>, _>("media_url")
                .map_err(ser)?
                .ok_or_else(|| StorageError::Serialization("missing media_url".into()))?;
            if task_type == TaskType::Audio {
                TaskContent::audio(url)
            } else {
                TaskContent::video(url)
            }
        }
    }
    .map_err(ser)?;

    Task::from_persisted(
        task_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        parse_level(&level)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        content,
        row.try_get::<Option<String>, _>("explanation")
            .map_err(ser)?,
        status,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_assessment_row(row: &SqliteRow) -> Result<AssessmentSession, StorageError> {
    let questions: String = row.try_get("questions").map_err(ser)?;
    let answers: String = row.try_get("answers").map_err(ser)?;
    let status: AssessmentStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let resulting_level = row
        .try_get::<Option<String>, _>("resulting_level")
        .map_err(ser)?
        .map(|raw| parse_level(&raw))
        .transpose()?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    AssessmentSession::from_persisted(
        assessment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        decode_snapshot(&questions)?,
        decode_answers(&answers)?,
        status,
        row.try_get("score").map_err(ser)?,
        resulting_level,
        row.try_get("started_at").map_err(ser)?,
        completed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<TaskProgress, StorageError> {
    let answers: String = row.try_get("answers").map_err(ser)?;

    Ok(TaskProgress {
        learner_id: learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        task_id: task_id_from_i64(row.try_get::<i64, _>("task_id").map_err(ser)?)?,
        answers: decode_answers(&answers)?,
        score: row.try_get("score").map_err(ser)?,
        percentage_correct: row.try_get("percentage_correct").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        time_taken_secs: row.try_get("time_taken_secs").map_err(ser)?,
    })
}
