use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, rng};

use tutor_core::model::{AssessmentQuestion, ProficiencyLevel};

pub const DEFAULT_QUESTIONS_PER_LEVEL: usize = 2;
pub const DEFAULT_MAX_QUESTIONS: usize = 12;

/// Chooses which bank questions a placement quiz asks.
///
/// Each level contributes up to `per_level` random questions; the combined set is
/// shuffled and cut to `max_questions`. Levels with fewer questions contribute what
/// they have, so per-level counts are a target rather than a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentPlan {
    per_level: usize,
    max_questions: usize,
}

impl Default for AssessmentPlan {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS_PER_LEVEL, DEFAULT_MAX_QUESTIONS)
    }
}

impl AssessmentPlan {
    /// Zero limits are raised to one so a non-empty bank always yields a quiz.
    #[must_use]
    pub fn new(per_level: usize, max_questions: usize) -> Self {
        Self {
            per_level: per_level.max(1),
            max_questions: max_questions.max(1),
        }
    }

    #[must_use]
    pub fn per_level(&self) -> usize {
        self.per_level
    }

    #[must_use]
    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    /// Sample from `bank` using the thread-local RNG.
    #[must_use]
    pub fn sample(&self, bank: Vec<AssessmentQuestion>) -> Vec<AssessmentQuestion> {
        self.sample_with(bank, &mut rng())
    }

    /// Sample from `bank` with a caller-supplied RNG.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        bank: Vec<AssessmentQuestion>,
        rng: &mut R,
    ) -> Vec<AssessmentQuestion> {
        let mut by_level: BTreeMap<ProficiencyLevel, Vec<AssessmentQuestion>> = BTreeMap::new();
        for question in bank {
            by_level.entry(question.level()).or_default().push(question);
        }

        let mut selected = Vec::new();
        for (_, mut group) in by_level {
            group.shuffle(rng);
            group.truncate(self.per_level);
            selected.extend(group);
        }

        selected.shuffle(rng);
        selected.truncate(self.max_questions);
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tutor_core::model::QuestionId;

    fn bank(per_level: u64) -> Vec<AssessmentQuestion> {
        let mut out = Vec::new();
        for (i, level) in ProficiencyLevel::ALL.iter().enumerate() {
            for j in 0..per_level {
                let id = (i as u64) * 100 + j + 1;
                out.push(
                    AssessmentQuestion::new(
                        QuestionId::new(id),
                        *level,
                        format!("Q{id}"),
                        vec!["a".into(), "b".into()],
                        0,
                        1.0,
                        None,
                    )
                    .unwrap(),
                );
            }
        }
        out
    }

    #[test]
    fn takes_up_to_per_level_from_each_level() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = AssessmentPlan::new(2, 100).sample_with(bank(5), &mut rng);
        assert_eq!(picked.len(), 12);
        for level in ProficiencyLevel::ALL {
            assert_eq!(picked.iter().filter(|q| q.level() == level).count(), 2);
        }
        let unique: HashSet<_> = picked.iter().map(AssessmentQuestion::id).collect();
        assert_eq!(unique.len(), picked.len());
    }

    #[test]
    fn truncates_to_max_questions() {
        let mut rng = StdRng::seed_from_u64(1);
        let picked = AssessmentPlan::new(3, 5).sample_with(bank(3), &mut rng);
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn sparse_levels_contribute_what_they_have() {
        let mut sparse = bank(1);
        sparse.retain(|q| q.level() <= ProficiencyLevel::A2);
        let picked = AssessmentPlan::default().sample(sparse);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn non_empty_bank_never_yields_empty_quiz() {
        let picked = AssessmentPlan::new(0, 0).sample(bank(1));
        assert_eq!(picked.len(), 1);
        assert!(AssessmentPlan::default().sample(Vec::new()).is_empty());
    }
}
