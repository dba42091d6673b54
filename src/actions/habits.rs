use super::ordering::{assign_order, renormalize, reorder_changes, sorted_ids};
use super::scores::{without_habits, without_scores_before};
use super::{normalize_name, unchanged, Added, Snapshot};
use crate::ids;
use crate::models::{Habit, Priority};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

pub fn add_habit(state: &Snapshot, category_id: &str, name: &str, priority: Priority) -> Added {
    if !state.categories.contains_key(category_id) {
        return (unchanged(state), None);
    }
    let Some(name) = normalize_name(name) else {
        return (unchanged(state), None);
    };

    let id = ids::new_id();
    let mut next = (**state).clone();
    let habits = Arc::make_mut(&mut next.habits);
    renormalize(habits, |habit| habit.category_id == category_id);
    let sort_index = habits
        .values()
        .filter(|habit| habit.category_id == category_id)
        .count() as u32;
    habits.insert(
        id.clone(),
        Habit {
            id: id.clone(),
            category_id: category_id.to_string(),
            name,
            priority,
            sort_index,
            start_date: None,
            updated_at: ids::now(),
        },
    );

    (Arc::new(next), Some(id))
}

pub fn rename_habit(state: &Snapshot, habit_id: &str, name: &str) -> Snapshot {
    let Some(name) = normalize_name(name) else {
        return unchanged(state);
    };
    update_habit(state, habit_id, |habit| {
        if habit.name == name {
            return false;
        }
        habit.name = name;
        true
    })
}

pub fn set_habit_priority(state: &Snapshot, habit_id: &str, priority: Priority) -> Snapshot {
    update_habit(state, habit_id, |habit| {
        if habit.priority == priority {
            return false;
        }
        habit.priority = priority;
        true
    })
}

/// Changes the first day a habit can be scored. Scores dated before the new
/// start are dropped.
pub fn set_habit_start_date(state: &Snapshot, habit_id: &str, start_date: Option<NaiveDate>) -> Snapshot {
    let next = update_habit(state, habit_id, |habit| {
        if habit.start_date == start_date {
            return false;
        }
        habit.start_date = start_date;
        true
    });
    let Some(start) = start_date else {
        return next;
    };
    match without_scores_before(&next.daily_scores, habit_id, start) {
        Some(scores) => {
            let mut pruned = (*next).clone();
            pruned.daily_scores = Arc::new(scores);
            Arc::new(pruned)
        }
        None => next,
    }
}

pub fn delete_habit(state: &Snapshot, habit_id: &str) -> Snapshot {
    let Some(habit) = state.habits.get(habit_id) else {
        return unchanged(state);
    };
    let category_id = habit.category_id.clone();

    let mut next = (**state).clone();
    let habits = Arc::make_mut(&mut next.habits);
    habits.remove(habit_id);
    renormalize(habits, |habit| habit.category_id == category_id);

    let doomed: HashSet<String> = [habit_id.to_string()].into_iter().collect();
    if let Some(scores) = without_habits(&state.daily_scores, &doomed) {
        next.daily_scores = Arc::new(scores);
    }
    Arc::new(next)
}

/// Moves a habit to `target_index` within `target_category_id` (appends when
/// no index is given; out-of-range indices clamp to the end). Both the source
/// and target categories are renormalized.
pub fn move_habit(
    state: &Snapshot,
    habit_id: &str,
    target_category_id: &str,
    target_index: Option<usize>,
) -> Snapshot {
    let Some(habit) = state.habits.get(habit_id) else {
        return unchanged(state);
    };
    if !state.categories.contains_key(target_category_id) {
        return unchanged(state);
    }
    let source_category_id = habit.category_id.clone();

    let mut order = sorted_ids(&state.habits, |other| {
        other.category_id == target_category_id && other.id != habit_id
    });
    let position = target_index.unwrap_or(order.len()).min(order.len());
    order.insert(position, habit_id.to_string());

    let same_category = source_category_id == target_category_id;
    if same_category {
        let current = sorted_ids(&state.habits, |other| other.category_id == target_category_id);
        if current == order {
            return unchanged(state);
        }
    }

    let mut next = (**state).clone();
    let habits = Arc::make_mut(&mut next.habits);
    if let Some(moved) = habits.get_mut(habit_id) {
        moved.category_id = target_category_id.to_string();
        moved.updated_at = ids::now();
    }
    assign_order(habits, &order);
    if !same_category {
        renormalize(habits, |other| other.category_id == source_category_id);
    }
    Arc::new(next)
}

pub fn reorder_habits(state: &Snapshot, category_id: &str, ids: &[String]) -> Snapshot {
    if !state.categories.contains_key(category_id) {
        return unchanged(state);
    }
    let Some(order) = reorder_changes(&state.habits, ids, |habit| habit.category_id == category_id) else {
        return unchanged(state);
    };

    let mut next = (**state).clone();
    assign_order(Arc::make_mut(&mut next.habits), &order);
    Arc::new(next)
}

fn update_habit<F>(state: &Snapshot, habit_id: &str, apply: F) -> Snapshot
where
    F: FnOnce(&mut Habit) -> bool,
{
    let Some(current) = state.habits.get(habit_id) else {
        return unchanged(state);
    };
    let mut habit = current.clone();
    if !apply(&mut habit) {
        return unchanged(state);
    }
    habit.updated_at = ids::now();

    let mut next = (**state).clone();
    Arc::make_mut(&mut next.habits).insert(habit_id.to_string(), habit);
    Arc::new(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{added, date, empty};
    use crate::actions::{add_category, set_score};
    use crate::models::Score;

    fn order_in(state: &Snapshot, category_id: &str) -> Vec<String> {
        sorted_ids(&state.habits, |habit| habit.category_id == category_id)
    }

    fn board() -> (Snapshot, String, String, Vec<String>) {
        let (state, health) = added(add_category(&empty(), "Health"));
        let (mut state, work) = added(add_category(&state, "Work"));
        let mut habits = Vec::new();
        for name in ["Run", "Stretch", "Sleep early"] {
            let (next, id) = added(add_habit(&state, &health, name, Priority::Medium));
            state = next;
            habits.push(id);
        }
        (state, health, work, habits)
    }

    #[test]
    fn add_requires_existing_category() {
        let state = empty();
        let (next, id) = add_habit(&state, "nope", "Run", Priority::High);
        assert!(id.is_none());
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn habits_are_indexed_per_category() {
        let (state, health, work, habits) = board();
        let (state, focus) = added(add_habit(&state, &work, "Deep work", Priority::High));
        assert_eq!(order_in(&state, &health), habits);
        assert_eq!(state.habits[&focus].sort_index, 0);
    }

    #[test]
    fn move_between_categories_renormalizes_both() {
        let (state, health, work, habits) = board();
        let state = move_habit(&state, &habits[0], &work, None);
        assert_eq!(state.habits[&habits[0]].category_id, work);
        assert_eq!(state.habits[&habits[0]].sort_index, 0);
        assert_eq!(order_in(&state, &health), vec![habits[1].clone(), habits[2].clone()]);
        assert_eq!(state.habits[&habits[1]].sort_index, 0);
        assert_eq!(state.habits[&habits[2]].sort_index, 1);
    }

    #[test]
    fn move_within_category_honours_target_index() {
        let (state, health, _, habits) = board();
        let state = move_habit(&state, &habits[2], &health, Some(0));
        assert_eq!(
            order_in(&state, &health),
            vec![habits[2].clone(), habits[0].clone(), habits[1].clone()]
        );
        let same = move_habit(&state, &habits[2], &health, Some(0));
        assert!(Arc::ptr_eq(&state, &same));
        let clamped = move_habit(&state, &habits[2], &health, Some(99));
        assert_eq!(order_in(&clamped, &health).last(), Some(&habits[2]));
    }

    #[test]
    fn delete_habit_strips_scores_and_closes_gap() {
        let (state, health, _, habits) = board();
        let day = date("2026-05-01");
        let state = set_score(&state, day, &habits[1], Score::Done).expect("score set");
        let state = delete_habit(&state, &habits[1]);
        assert!(!state.habits.contains_key(&habits[1]));
        assert!(state.daily_scores.is_empty());
        assert_eq!(order_in(&state, &health), vec![habits[0].clone(), habits[2].clone()]);
        assert_eq!(state.habits[&habits[2]].sort_index, 1);
    }

    #[test]
    fn moving_start_date_forward_prunes_earlier_scores() {
        let (state, _, _, habits) = board();
        let early = date("2026-05-01");
        let late = date("2026-05-03");
        let state = set_score(&state, early, &habits[0], Score::Done).expect("score set");
        let state = set_score(&state, late, &habits[0], Score::Partial).expect("score set");
        let state = set_habit_start_date(&state, &habits[0], Some(date("2026-05-02")));
        assert!(!state.daily_scores.contains_key(&early));
        assert_eq!(state.daily_scores[&late][&habits[0]], Score::Partial);
    }

    #[test]
    fn priority_and_rename_are_noops_when_unchanged() {
        let (state, _, _, habits) = board();
        assert!(Arc::ptr_eq(&state, &set_habit_priority(&state, &habits[0], Priority::Medium)));
        assert!(Arc::ptr_eq(&state, &rename_habit(&state, &habits[0], " Run ")));
        let renamed = rename_habit(&state, &habits[0], "Jog");
        assert_eq!(renamed.habits[&habits[0]].name, "Jog");
    }

    #[test]
    fn reorder_habits_scopes_to_category() {
        let (state, health, work, habits) = board();
        let reversed: Vec<String> = habits.iter().rev().cloned().collect();
        assert!(Arc::ptr_eq(&state, &reorder_habits(&state, &work, &reversed)));
        let state = reorder_habits(&state, &health, &reversed);
        assert_eq!(order_in(&state, &health), reversed);
    }
}
