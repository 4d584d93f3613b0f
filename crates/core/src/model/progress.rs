use chrono::{DateTime, Utc};

use crate::model::answers::AnswerSet;
use crate::model::ids::{LearnerId, TaskId};
use crate::scoring::WeightedScore;

/// A learner's latest result on one task.
///
/// There is one record per (learner, task); submitting again overwrites it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    pub learner_id: LearnerId,
    pub task_id: TaskId,
    pub answers: AnswerSet,
    /// Raw earned weight, not normalized.
    pub score: f64,
    /// 0–100.
    pub percentage_correct: f64,
    pub completed_at: DateTime<Utc>,
    pub time_taken_secs: Option<f64>,
}

impl TaskProgress {
    #[must_use]
    pub fn record(
        learner_id: LearnerId,
        task_id: TaskId,
        answers: AnswerSet,
        weighted: WeightedScore,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            learner_id,
            task_id,
            answers,
            score: weighted.earned,
            percentage_correct: weighted.percentage(),
            completed_at,
            time_taken_secs: None,
        }
    }

    #[must_use]
    pub fn with_time_taken(mut self, secs: Option<f64>) -> Self {
        self.time_taken_secs = secs;
        self
    }

    /// Replaces the stored submission with a newer one.
    pub fn resubmit(&mut self, answers: AnswerSet, weighted: WeightedScore, at: DateTime<Utc>) {
        self.answers = answers;
        self.score = weighted.earned;
        self.percentage_correct = weighted.percentage();
        self.completed_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::fixed_now;

    #[test]
    fn record_keeps_raw_score_and_percentage() {
        let progress = TaskProgress::record(
            LearnerId::new(1),
            TaskId::new(2),
            AnswerSet::new(),
            WeightedScore {
                earned: 1.5,
                total: 3.0,
            },
            fixed_now(),
        );
        assert_eq!(progress.score, 1.5);
        assert_eq!(progress.percentage_correct, 50.0);
    }

    #[test]
    fn resubmit_overwrites_in_place() {
        let mut progress = TaskProgress::record(
            LearnerId::new(1),
            TaskId::new(2),
            AnswerSet::new(),
            WeightedScore {
                earned: 0.0,
                total: 2.0,
            },
            fixed_now(),
        );
        let later = fixed_now() + chrono::Duration::days(1);
        let answers: AnswerSet = [(QuestionId::new(5), 1)].into_iter().collect();
        progress.resubmit(
            answers.clone(),
            WeightedScore {
                earned: 2.0,
                total: 2.0,
            },
            later,
        );

        assert_eq!(progress.answers, answers);
        assert_eq!(progress.score, 2.0);
        assert_eq!(progress.percentage_correct, 100.0);
        assert_eq!(progress.completed_at, later);
    }
}
