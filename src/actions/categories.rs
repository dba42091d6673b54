use super::ordering::{assign_order, renormalize, reorder_changes};
use super::scores::without_habits;
use super::{normalize_name, unchanged, Added, Snapshot};
use crate::ids;
use crate::models::Category;
use std::collections::HashSet;
use std::sync::Arc;

pub fn add_category(state: &Snapshot, name: &str) -> Added {
    let Some(name) = normalize_name(name) else {
        return (unchanged(state), None);
    };

    let now = ids::now();
    let id = ids::new_id();
    let mut next = (**state).clone();
    let categories = Arc::make_mut(&mut next.categories);
    renormalize(categories, |_| true);
    let sort_index = categories.len() as u32;
    categories.insert(
        id.clone(),
        Category {
            id: id.clone(),
            name,
            sort_index,
            created_at: now,
            updated_at: now,
        },
    );

    (Arc::new(next), Some(id))
}

pub fn rename_category(state: &Snapshot, category_id: &str, name: &str) -> Snapshot {
    let Some(name) = normalize_name(name) else {
        return unchanged(state);
    };
    match state.categories.get(category_id) {
        Some(category) if category.name != name => {}
        _ => return unchanged(state),
    }

    let mut next = (**state).clone();
    if let Some(category) = Arc::make_mut(&mut next.categories).get_mut(category_id) {
        category.name = name;
        category.updated_at = ids::now();
    }
    Arc::new(next)
}

/// Removes the category, every habit filed under it, and those habits' scores.
pub fn delete_category(state: &Snapshot, category_id: &str) -> Snapshot {
    if !state.categories.contains_key(category_id) {
        return unchanged(state);
    }

    let mut next = (**state).clone();
    let categories = Arc::make_mut(&mut next.categories);
    categories.remove(category_id);
    renormalize(categories, |_| true);

    let doomed: HashSet<String> = state
        .habits
        .values()
        .filter(|habit| habit.category_id == category_id)
        .map(|habit| habit.id.clone())
        .collect();
    if !doomed.is_empty() {
        Arc::make_mut(&mut next.habits).retain(|habit_id, _| !doomed.contains(habit_id));
        if let Some(scores) = without_habits(&state.daily_scores, &doomed) {
            next.daily_scores = Arc::new(scores);
        }
    }

    Arc::new(next)
}

pub fn reorder_categories(state: &Snapshot, ids: &[String]) -> Snapshot {
    let Some(order) = reorder_changes(&state.categories, ids, |_| true) else {
        return unchanged(state);
    };

    let mut next = (**state).clone();
    assign_order(Arc::make_mut(&mut next.categories), &order);
    Arc::new(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{added, date, empty};
    use crate::actions::{add_habit, set_score};
    use crate::models::{Priority, Score};

    fn dense(state: &Snapshot) -> bool {
        let mut indices: Vec<u32> = state.categories.values().map(|c| c.sort_index).collect();
        indices.sort_unstable();
        indices.into_iter().eq(0..state.categories.len() as u32)
    }

    #[test]
    fn add_assigns_next_index_and_timestamps() {
        let (state, first) = added(add_category(&empty(), "  Health "));
        let (state, second) = added(add_category(&state, "Work"));
        assert_eq!(state.categories[&first].name, "Health");
        assert_eq!(state.categories[&first].sort_index, 0);
        assert_eq!(state.categories[&second].sort_index, 1);
        assert_eq!(state.categories[&second].created_at, state.categories[&second].updated_at);
    }

    #[test]
    fn add_lands_after_categories_with_sparse_indices() {
        let (state, health) = added(add_category(&empty(), "Health"));
        let (state, work) = added(add_category(&state, "Work"));
        let mut sparse = (*state).clone();
        if let Some(category) = Arc::make_mut(&mut sparse.categories).get_mut(&work) {
            category.sort_index = 5;
        }

        let (state, home) = added(add_category(&Arc::new(sparse), "Home"));
        assert_eq!(state.categories[&health].sort_index, 0);
        assert_eq!(state.categories[&work].sort_index, 1);
        assert_eq!(state.categories[&home].sort_index, 2);
        assert!(dense(&state));
    }

    #[test]
    fn blank_name_is_a_noop() {
        let state = empty();
        let (next, id) = add_category(&state, "   ");
        assert!(id.is_none());
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn sort_indices_stay_dense_across_mixed_operations() {
        let mut state = empty();
        let mut live: Vec<String> = Vec::new();
        for round in 0..12 {
            let (next, id) = added(add_category(&state, &format!("Category {}", round)));
            state = next;
            live.push(id);
            if round % 3 == 2 {
                let victim = live.remove(round % live.len());
                state = delete_category(&state, &victim);
            }
            if round % 4 == 1 {
                let mut reversed = live.clone();
                reversed.reverse();
                reversed.push("missing".to_string());
                state = reorder_categories(&state, &reversed);
            }
            assert!(dense(&state), "gap after round {}", round);
        }
        assert_eq!(state.categories.len(), live.len());
    }

    #[test]
    fn delete_cascades_to_habits_and_scores() {
        let (state, health) = added(add_category(&empty(), "Health"));
        let (state, work) = added(add_category(&state, "Work"));
        let (state, run) = added(add_habit(&state, &health, "Run", Priority::High));
        let (state, email) = added(add_habit(&state, &work, "Inbox zero", Priority::Low));
        let day_one = date("2026-03-01");
        let day_two = date("2026-03-02");
        let state = set_score(&state, day_one, &run, Score::Done).expect("score");
        let state = set_score(&state, day_two, &run, Score::Partial).expect("score");
        let state = set_score(&state, day_two, &email, Score::Done).expect("score");

        let state = delete_category(&state, &health);

        assert!(!state.categories.contains_key(&health));
        assert_eq!(state.categories[&work].sort_index, 0);
        assert!(state.habits.values().all(|habit| habit.category_id != health));
        assert!(!state.daily_scores.contains_key(&day_one));
        assert_eq!(state.daily_scores[&day_two].len(), 1);
        assert!(state.daily_scores.values().all(|day| !day.contains_key(&run)));
    }

    #[test]
    fn deleting_the_only_category_leaves_no_categories() {
        let (state, id) = added(add_category(&empty(), "Health"));
        let state = delete_category(&state, &id);
        assert!(state.categories.is_empty());
        assert!(state.habits.is_empty());
    }

    #[test]
    fn delete_unknown_category_returns_same_snapshot() {
        let state = empty();
        assert!(Arc::ptr_eq(&state, &delete_category(&state, "c1")));
    }

    #[test]
    fn rename_rejects_blank_and_identical_names() {
        let (state, id) = added(add_category(&empty(), "Health"));
        assert!(Arc::ptr_eq(&state, &rename_category(&state, &id, "  ")));
        assert!(Arc::ptr_eq(&state, &rename_category(&state, &id, "Health ")));
        let renamed = rename_category(&state, &id, "Fitness");
        assert_eq!(renamed.categories[&id].name, "Fitness");
        assert_eq!(state.categories[&id].name, "Health");
    }

    #[test]
    fn untouched_collections_are_shared() {
        let (state, _) = added(add_category(&empty(), "Health"));
        let (next, _) = added(add_category(&state, "Work"));
        assert!(Arc::ptr_eq(&state.todos, &next.todos));
        assert!(!Arc::ptr_eq(&state.categories, &next.categories));
    }
}
