mod answers;
mod assessment;
mod ids;
mod learner;
mod level;
mod progress;
mod question;
mod task;

pub use answers::AnswerSet;
pub use assessment::{
    AssessmentError, AssessmentOutcome, AssessmentSession, AssessmentStatus, NewAssessment,
};
pub use ids::{AssessmentId, LearnerId, ParseIdError, QuestionId, TaskId};
pub use learner::{LearnerError, LearnerProfile};
pub use level::{InvalidLevelError, ProficiencyLevel};
pub use progress::TaskProgress;
pub use question::{AssessmentQuestion, QuestionError, ScorableQuestion, SkillType, TaskQuestion};
pub use task::{Task, TaskContent, TaskError, TaskStatus, TaskType};
