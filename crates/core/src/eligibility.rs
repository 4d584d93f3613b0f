//! Which practice tasks a learner may be offered.
//!
//! The pool is the learner's level widened by one step each way, restricted to
//! published tasks.

use rand::seq::IndexedRandom;

use crate::model::{InvalidLevelError, ProficiencyLevel, Task};

/// Current level plus its immediate neighbours, ascending.
#[must_use]
pub fn eligible_levels(current: ProficiencyLevel) -> Vec<ProficiencyLevel> {
    [current.lower(), Some(current), current.higher()]
        .into_iter()
        .flatten()
        .collect()
}

/// Parses a stored level string before widening it.
///
/// # Errors
///
/// Returns `InvalidLevelError` if `raw` is not one of the six levels.
pub fn eligible_levels_for(raw: &str) -> Result<Vec<ProficiencyLevel>, InvalidLevelError> {
    raw.parse().map(eligible_levels)
}

/// True when `task` may be offered to a learner at `current`.
#[must_use]
pub fn is_eligible(task: &Task, current: ProficiencyLevel) -> bool {
    task.is_published() && task.level().rank().abs_diff(current.rank()) <= 1
}

/// How to pick among eligible tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// First eligible task in pool order.
    FirstMatch,
    /// Uniformly random eligible task.
    #[default]
    Random,
}

/// Picks one eligible task, or `None` when nothing in the pool qualifies.
#[must_use]
pub fn select_task(
    pool: &[Task],
    current: ProficiencyLevel,
    policy: SelectionPolicy,
) -> Option<&Task> {
    let eligible: Vec<&Task> = pool.iter().filter(|t| is_eligible(t, current)).collect();
    match policy {
        SelectionPolicy::FirstMatch => eligible.first().copied(),
        SelectionPolicy::Random => eligible.choose(&mut rand::rng()).copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProficiencyLevel::*;
    use crate::model::{TaskContent, TaskId};
    use crate::time::fixed_now;

    fn task(id: u64, level: ProficiencyLevel, published: bool) -> Task {
        let mut task = Task::new(
            TaskId::new(id),
            level,
            format!("Task {id}"),
            TaskContent::text("Body").unwrap(),
            None,
            fixed_now(),
        )
        .unwrap();
        if published {
            task.publish(fixed_now());
        }
        task
    }

    #[test]
    fn widens_by_one_step_within_bounds() {
        assert_eq!(eligible_levels(A1), vec![A1, A2]);
        assert_eq!(eligible_levels(B1), vec![A2, B1, B2]);
        assert_eq!(eligible_levels(C2), vec![C1, C2]);
    }

    #[test]
    fn parses_stored_level_strings() {
        assert_eq!(eligible_levels_for("c1").unwrap(), vec![B2, C1, C2]);
        let err = eligible_levels_for("Z9").unwrap_err();
        assert_eq!(err.raw, "Z9");
    }

    #[test]
    fn c1_learner_never_gets_a1_tasks() {
        let pool = vec![
            task(1, A1, true),
            task(2, B2, true),
            task(3, C1, true),
            task(4, C2, true),
        ];
        let eligible: Vec<u64> = pool
            .iter()
            .filter(|t| is_eligible(t, C1))
            .map(|t| t.id().value())
            .collect();
        assert_eq!(eligible, vec![2, 3, 4]);

        for _ in 0..50 {
            let picked = select_task(&pool, C1, SelectionPolicy::Random).unwrap();
            assert!(eligible_levels(C1).contains(&picked.level()));
            assert!(picked.is_published());
        }
    }

    #[test]
    fn drafts_are_never_selected() {
        let pool = vec![task(1, B1, false), task(2, B1, true)];
        let picked = select_task(&pool, B1, SelectionPolicy::FirstMatch).unwrap();
        assert_eq!(picked.id(), TaskId::new(2));
    }

    #[test]
    fn empty_pool_yields_none() {
        assert!(select_task(&[], B1, SelectionPolicy::Random).is_none());
        let out_of_range = vec![task(1, C2, true), task(2, A2, false)];
        assert!(select_task(&out_of_range, A1, SelectionPolicy::FirstMatch).is_none());
    }
}
