use thiserror::Error;

use crate::model::{AssessmentError, InvalidLevelError, LearnerError, QuestionError, TaskError};
use crate::scoring::ScoreOutOfRange;

/// Any domain rule violation raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Score(#[from] ScoreOutOfRange),
    #[error(transparent)]
    Level(#[from] InvalidLevelError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
}
