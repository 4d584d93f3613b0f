use std::collections::BTreeMap;

use crate::model::ids::QuestionId;

/// A learner's chosen option per question.
///
/// Questions without an entry count as unanswered. Recording the same question
/// twice keeps the latest choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    entries: BTreeMap<QuestionId, u32>,
}

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a choice and returns the one it replaced, if any.
    pub fn record(&mut self, question: QuestionId, option: u32) -> Option<u32> {
        self.entries.insert(question, option)
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<u32> {
        self.entries.get(&question).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending question id order.
    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, u32)> + '_ {
        self.entries.iter().map(|(id, option)| (*id, *option))
    }
}

impl FromIterator<(QuestionId, u32)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (QuestionId, u32)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_choice_wins() {
        let mut answers = AnswerSet::new();
        assert_eq!(answers.record(QuestionId::new(1), 0), None);
        assert_eq!(answers.record(QuestionId::new(1), 2), Some(0));
        assert_eq!(answers.get(QuestionId::new(1)), Some(2));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn iterates_in_id_order() {
        let answers: AnswerSet = [(QuestionId::new(9), 1), (QuestionId::new(2), 3)]
            .into_iter()
            .collect();
        let ids: Vec<u64> = answers.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![2, 9]);
    }
}
