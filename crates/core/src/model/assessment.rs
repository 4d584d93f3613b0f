use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::answers::AnswerSet;
use crate::model::ids::{AssessmentId, LearnerId, QuestionId};
use crate::model::level::ProficiencyLevel;
use crate::model::question::ScorableQuestion;
use crate::scoring::{self, ScoreOutOfRange};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AssessmentError {
    /// The session already reached a terminal state.
    #[error("assessment is no longer active (status: {status})")]
    InvalidState { status: AssessmentStatus },

    #[error("question {0} is not part of this assessment")]
    UnknownQuestion(QuestionId),

    #[error(transparent)]
    Score(#[from] ScoreOutOfRange),

    #[error("unknown assessment status: {0:?}")]
    UnknownStatus(String),

    #[error("completed_at must be set exactly when the assessment is completed")]
    CompletionMismatch,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssessmentStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl AssessmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Abandoned => "abandoned",
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, AssessmentStatus::InProgress)
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentStatus {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AssessmentStatus::InProgress),
            "completed" => Ok(AssessmentStatus::Completed),
            "abandoned" => Ok(AssessmentStatus::Abandoned),
            other => Err(AssessmentError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Score and level produced by completing a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentOutcome {
    pub score: f64,
    pub level: ProficiencyLevel,
}

//
// ─── NEW SESSION ───────────────────────────────────────────────────────────────
//

/// A session that storage has not yet assigned an id to.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub learner_id: LearnerId,
    pub questions: Vec<ScorableQuestion>,
    pub started_at: DateTime<Utc>,
}

impl NewAssessment {
    #[must_use]
    pub fn new(
        learner_id: LearnerId,
        questions: Vec<ScorableQuestion>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            learner_id,
            questions,
            started_at,
        }
    }

    #[must_use]
    pub fn assign_id(self, id: AssessmentId) -> AssessmentSession {
        AssessmentSession {
            id,
            learner_id: self.learner_id,
            questions: self.questions,
            answers: AnswerSet::new(),
            status: AssessmentStatus::InProgress,
            score: 0.0,
            resulting_level: None,
            started_at: self.started_at,
            completed_at: None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One placement quiz for one learner.
///
/// ```text
/// in_progress ──complete──▶ completed
///      └──────abandon─────▶ abandoned
/// ```
///
/// The question set is fixed at start; answers accumulate until completion.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentSession {
    id: AssessmentId,
    learner_id: LearnerId,
    questions: Vec<ScorableQuestion>,
    answers: AnswerSet,
    status: AssessmentStatus,
    score: f64,
    resulting_level: Option<ProficiencyLevel>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    /// Rehydrate a session from storage.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::CompletionMismatch` if `completed_at` is present for a
    /// session that is not completed, or missing for one that is.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AssessmentId,
        learner_id: LearnerId,
        questions: Vec<ScorableQuestion>,
        answers: AnswerSet,
        status: AssessmentStatus,
        score: f64,
        resulting_level: Option<ProficiencyLevel>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AssessmentError> {
        if (status == AssessmentStatus::Completed) != completed_at.is_some() {
            return Err(AssessmentError::CompletionMismatch);
        }
        Ok(Self {
            id,
            learner_id,
            questions,
            answers,
            status,
            score,
            resulting_level,
            started_at,
            completed_at,
        })
    }

    fn ensure_in_progress(&self) -> Result<(), AssessmentError> {
        if self.status.is_terminal() {
            return Err(AssessmentError::InvalidState {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Records (or overwrites) the learner's choice for one question.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` once the session is terminal, or `UnknownQuestion` if the
    /// question is not in this session's set.
    pub fn record_answer(
        &mut self,
        question: QuestionId,
        option: u32,
    ) -> Result<(), AssessmentError> {
        self.ensure_in_progress()?;
        if !self.questions.iter().any(|q| q.id == question) {
            return Err(AssessmentError::UnknownQuestion(question));
        }
        self.answers.record(question, option);
        Ok(())
    }

    /// Scores the recorded answers, classifies the level and closes the session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the session is not in progress.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<AssessmentOutcome, AssessmentError> {
        self.ensure_in_progress()?;

        let score = scoring::compute_score(&self.questions, &self.answers);
        let level = scoring::classify_level(score)?;

        self.score = score;
        self.resulting_level = Some(level);
        self.status = AssessmentStatus::Completed;
        self.completed_at = Some(at);

        Ok(AssessmentOutcome { score, level })
    }

    /// Closes the session without a result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the session is not in progress.
    pub fn abandon(&mut self) -> Result<(), AssessmentError> {
        self.ensure_in_progress()?;
        self.status = AssessmentStatus::Abandoned;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn questions(&self) -> &[ScorableQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn status(&self) -> AssessmentStatus {
        self.status
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn resulting_level(&self) -> Option<ProficiencyLevel> {
        self.resulting_level
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Index of the first question without a recorded answer.
    #[must_use]
    pub fn next_unanswered(&self) -> Option<usize> {
        self.questions
            .iter()
            .position(|q| self.answers.get(q.id).is_none())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
