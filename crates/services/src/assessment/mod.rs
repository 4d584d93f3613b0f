mod plan;
mod service;

pub use plan::{AssessmentPlan, DEFAULT_MAX_QUESTIONS, DEFAULT_QUESTIONS_PER_LEVEL};
pub use service::{AssessmentService, StartedAssessment};
