//! Weighted scoring and CEFR level classification.
//!
//! Both functions are pure: they read question weights and recorded answers and
//! never touch storage.

use thiserror::Error;

use crate::model::{AnswerSet, ProficiencyLevel, ScorableQuestion};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A score outside `[0.0, 1.0]` reached the classifier.
///
/// Scores come from `compute_score`, so this always points at a caller bug.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("score {score} is outside [0.0, 1.0]")]
pub struct ScoreOutOfRange {
    pub score: f64,
}

//
// ─── WEIGHTED TALLY ────────────────────────────────────────────────────────────
//

/// Earned and total weight over one question set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedScore {
    pub earned: f64,
    pub total: f64,
}

impl WeightedScore {
    /// `earned / total`, or `0.0` when the set carries no weight.
    #[must_use]
    pub fn normalized(&self) -> f64 {
        if self.total == 0.0 {
            return 0.0;
        }
        self.earned / self.total
    }

    /// Share of the weight answered correctly, on a 0–100 scale.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.normalized() * 100.0
    }
}

/// Sums question weights, crediting those whose recorded option matches the key.
///
/// Unanswered questions still count toward `total`.
#[must_use]
pub fn tally<'a>(
    questions: impl IntoIterator<Item = &'a ScorableQuestion>,
    answers: &AnswerSet,
) -> WeightedScore {
    questions
        .into_iter()
        .fold(WeightedScore::default(), |mut acc, question| {
            acc.total += question.weight;
            if answers.get(question.id) == Some(question.correct_answer) {
                acc.earned += question.weight;
            }
            acc
        })
}

/// Normalized weighted score in `[0.0, 1.0]`.
///
/// Returns exactly `0.0` for an empty or weightless question set.
#[must_use]
pub fn compute_score(questions: &[ScorableQuestion], answers: &AnswerSet) -> f64 {
    tally(questions, answers).normalized()
}

//
// ─── LEVEL CLASSIFIER ──────────────────────────────────────────────────────────
//

/// Lower bound (inclusive) of each level. A level's range ends where the next begins;
/// the last range is closed at `1.0`.
pub const LEVEL_THRESHOLDS: [(ProficiencyLevel, f64); 6] = [
    (ProficiencyLevel::A1, 0.0),
    (ProficiencyLevel::A2, 0.20),
    (ProficiencyLevel::B1, 0.40),
    (ProficiencyLevel::B2, 0.60),
    (ProficiencyLevel::C1, 0.80),
    (ProficiencyLevel::C2, 0.95),
];

/// Maps a normalized score to its CEFR level.
///
/// # Errors
///
/// Returns `ScoreOutOfRange` when `score` is NaN or outside `[0.0, 1.0]`.
pub fn classify_level(score: f64) -> Result<ProficiencyLevel, ScoreOutOfRange> {
    if !(0.0..=1.0).contains(&score) {
        return Err(ScoreOutOfRange { score });
    }

    let level = LEVEL_THRESHOLDS
        .iter()
        .rev()
        .find(|(_, lower)| score >= *lower)
        .map_or(ProficiencyLevel::A1, |(level, _)| *level);
    Ok(level)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
