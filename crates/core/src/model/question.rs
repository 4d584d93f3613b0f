use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{QuestionId, TaskId};
use crate::model::level::ProficiencyLevel;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least two answer options, got {count}")]
    TooFewOptions { count: usize },

    #[error("answer option {index} is blank")]
    BlankOption { index: usize },

    #[error("correct answer index {index} is outside the {count} options")]
    CorrectAnswerOutOfBounds { index: u32, count: usize },

    #[error("question weight must be a positive number, got {weight}")]
    InvalidWeight { weight: f64 },

    #[error("question order must be > 0")]
    InvalidOrder,

    #[error("unknown skill type: {0:?}")]
    UnknownSkill(String),
}

//
// ─── SCORABLE QUESTION ─────────────────────────────────────────────────────────
//

/// The part of a question the scoring engine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorableQuestion {
    pub id: QuestionId,
    pub weight: f64,
    pub correct_answer: u32,
}

impl ScorableQuestion {
    /// Weight used when the author does not set one.
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    #[must_use]
    pub fn new(id: QuestionId, weight: f64, correct_answer: u32) -> Self {
        Self {
            id,
            weight,
            correct_answer,
        }
    }
}

//
// ─── SHARED CHOICE VALIDATION ──────────────────────────────────────────────────
//

/// Checks the rules every multiple-choice question shares and returns the trimmed text.
fn validate_choice(
    text: &str,
    options: &[String],
    correct_answer: u32,
    weight: f64,
) -> Result<String, QuestionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(QuestionError::EmptyText);
    }
    if options.len() < 2 {
        return Err(QuestionError::TooFewOptions {
            count: options.len(),
        });
    }
    if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
        return Err(QuestionError::BlankOption { index });
    }
    let in_bounds = usize::try_from(correct_answer).is_ok_and(|idx| idx < options.len());
    if !in_bounds {
        return Err(QuestionError::CorrectAnswerOutOfBounds {
            index: correct_answer,
            count: options.len(),
        });
    }
    if !weight.is_finite() || weight <= 0.0 {
        return Err(QuestionError::InvalidWeight { weight });
    }
    Ok(text.to_owned())
}

//
// ─── SKILL TYPE ────────────────────────────────────────────────────────────────
//

/// What an assessment question exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillType {
    Grammar,
    Vocabulary,
    Reading,
    Listening,
}

impl SkillType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SkillType::Grammar => "grammar",
            SkillType::Vocabulary => "vocabulary",
            SkillType::Reading => "reading",
            SkillType::Listening => "listening",
        }
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillType {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grammar" => Ok(SkillType::Grammar),
            "vocabulary" => Ok(SkillType::Vocabulary),
            "reading" => Ok(SkillType::Reading),
            "listening" => Ok(SkillType::Listening),
            _ => Err(QuestionError::UnknownSkill(s.to_owned())),
        }
    }
}

//
// ─── ASSESSMENT QUESTION ───────────────────────────────────────────────────────
//

/// A placement-quiz question tagged with the level it tests.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentQuestion {
    id: QuestionId,
    level: ProficiencyLevel,
    text: String,
    options: Vec<String>,
    correct_answer: u32,
    weight: f64,
    skill: Option<SkillType>,
}

impl AssessmentQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError` when text, options, correct index or weight are invalid.
    pub fn new(
        id: QuestionId,
        level: ProficiencyLevel,
        text: impl AsRef<str>,
        options: Vec<String>,
        correct_answer: u32,
        weight: f64,
        skill: Option<SkillType>,
    ) -> Result<Self, QuestionError> {
        let text = validate_choice(text.as_ref(), &options, correct_answer, weight)?;
        Ok(Self {
            id,
            level,
            text,
            options,
            correct_answer,
            weight,
            skill,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn level(&self) -> ProficiencyLevel {
        self.level
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> u32 {
        self.correct_answer
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn skill(&self) -> Option<SkillType> {
        self.skill
    }

    #[must_use]
    pub fn scorable(&self) -> ScorableQuestion {
        ScorableQuestion::new(self.id, self.weight, self.correct_answer)
    }
}

//
// ─── TASK QUESTION ─────────────────────────────────────────────────────────────
//

/// A follow-up question attached to a practice task, shown in `order`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuestion {
    id: QuestionId,
    task_id: TaskId,
    text: String,
    options: Vec<String>,
    correct_answer: u32,
    weight: f64,
    order: u32,
}

impl TaskQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError` when the choice data is invalid or `order` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        task_id: TaskId,
        text: impl AsRef<str>,
        options: Vec<String>,
        correct_answer: u32,
        weight: f64,
        order: u32,
    ) -> Result<Self, QuestionError> {
        let text = validate_choice(text.as_ref(), &options, correct_answer, weight)?;
        if order == 0 {
            return Err(QuestionError::InvalidOrder);
        }
        Ok(Self {
            id,
            task_id,
            text,
            options,
            correct_answer,
            weight,
            order,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> u32 {
        self.correct_answer
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn scorable(&self) -> ScorableQuestion {
        ScorableQuestion::new(self.id, self.weight, self.correct_answer)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
