use super::{unchanged, Snapshot};
use crate::errors::{AppError, AppResult};
use crate::models::{AppState, DayScores, Score};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Day locking is retired: no date is ever locked.
pub fn is_locked(_state: &AppState, _date: NaiveDate) -> bool {
    false
}

/// Kept for callers of the retired lock flow; always returns the input.
pub fn commit_if_needed(state: &Snapshot, _date: NaiveDate) -> Snapshot {
    unchanged(state)
}

pub fn set_score(state: &Snapshot, date: NaiveDate, habit_id: &str, score: Score) -> AppResult<Snapshot> {
    if is_locked(state, date) {
        return Err(AppError::DateLocked(format!("{} is locked", date)));
    }
    let Some(habit) = state.habits.get(habit_id) else {
        return Err(AppError::NotFound(format!("habit {}", habit_id)));
    };
    if let Some(start) = habit.start_date {
        if date < start {
            return Err(AppError::HabitNotStarted(format!(
                "habit {} starts on {}, cannot score {}",
                habit_id, start, date
            )));
        }
    }
    if state.daily_scores.get(&date).and_then(|day| day.get(habit_id)) == Some(&score) {
        return Ok(unchanged(state));
    }

    let mut next = (**state).clone();
    Arc::make_mut(&mut next.daily_scores)
        .entry(date)
        .or_default()
        .insert(habit_id.to_string(), score);
    Ok(Arc::new(next))
}

pub fn clear_score(state: &Snapshot, date: NaiveDate, habit_id: &str) -> Snapshot {
    let present = state
        .daily_scores
        .get(&date)
        .is_some_and(|day| day.contains_key(habit_id));
    if !present {
        return unchanged(state);
    }

    let mut next = (**state).clone();
    let scores = Arc::make_mut(&mut next.daily_scores);
    if let Some(day) = scores.get_mut(&date) {
        day.remove(habit_id);
        if day.is_empty() {
            scores.remove(&date);
        }
    }
    Arc::new(next)
}

/// Copy of `scores` without the given habits, empty days dropped. `None` when
/// nothing referenced them.
pub(crate) fn without_habits(
    scores: &BTreeMap<NaiveDate, DayScores>,
    habit_ids: &HashSet<String>,
) -> Option<BTreeMap<NaiveDate, DayScores>> {
    let touched = scores
        .values()
        .any(|day| day.keys().any(|habit_id| habit_ids.contains(habit_id)));
    if !touched {
        return None;
    }
    Some(
        scores
            .iter()
            .filter_map(|(date, day)| {
                let kept: DayScores = day
                    .iter()
                    .filter(|(habit_id, _)| !habit_ids.contains(*habit_id))
                    .map(|(habit_id, score)| (habit_id.clone(), *score))
                    .collect();
                (!kept.is_empty()).then(|| (*date, kept))
            })
            .collect(),
    )
}

/// Copy of `scores` without entries for `habit_id` dated before `start`.
pub(crate) fn without_scores_before(
    scores: &BTreeMap<NaiveDate, DayScores>,
    habit_id: &str,
    start: NaiveDate,
) -> Option<BTreeMap<NaiveDate, DayScores>> {
    let touched = scores
        .range(..start)
        .any(|(_, day)| day.contains_key(habit_id));
    if !touched {
        return None;
    }
    let mut next = scores.clone();
    next.retain(|date, day| {
        if *date < start {
            day.remove(habit_id);
        }
        !day.is_empty()
    });
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{added, date, empty};
    use crate::actions::{add_category, add_habit, set_habit_start_date};
    use crate::models::Priority;

    fn with_habit() -> (Snapshot, String) {
        let (state, category) = added(add_category(&empty(), "Health"));
        added(add_habit(&state, &category, "Stretch", Priority::Medium))
    }

    #[test]
    fn set_score_creates_day_bucket() {
        let (state, habit) = with_habit();
        let day = date("2026-04-10");
        let next = set_score(&state, day, &habit, Score::Partial).expect("score set");
        assert_eq!(next.daily_scores[&day][&habit], Score::Partial);
        assert!(state.daily_scores.is_empty());
    }

    #[test]
    fn unknown_habit_is_a_hard_failure() {
        let state = empty();
        let error = set_score(&state, date("2026-04-10"), "ghost", Score::Done).expect_err("must fail");
        assert!(error.to_string().starts_with("NOT_FOUND"));
    }

    #[test]
    fn scoring_before_start_date_fails_and_on_start_date_succeeds() {
        let (state, habit) = with_habit();
        let start = date("2026-04-10");
        let state = set_habit_start_date(&state, &habit, Some(start));

        let error = set_score(&state, date("2026-04-09"), &habit, Score::Done).expect_err("before start");
        assert!(matches!(error, AppError::HabitNotStarted(_)));

        let next = set_score(&state, start, &habit, Score::Done).expect("on start date");
        assert_eq!(next.daily_scores[&start][&habit], Score::Done);
    }

    #[test]
    fn repeating_the_same_score_keeps_the_snapshot() {
        let (state, habit) = with_habit();
        let day = date("2026-04-10");
        let scored = set_score(&state, day, &habit, Score::Miss).expect("score set");
        let again = set_score(&scored, day, &habit, Score::Miss).expect("score set");
        assert!(Arc::ptr_eq(&scored, &again));
    }

    #[test]
    fn clear_score_drops_empty_day() {
        let (state, habit) = with_habit();
        let day = date("2026-04-10");
        let scored = set_score(&state, day, &habit, Score::Done).expect("score set");
        let cleared = clear_score(&scored, day, &habit);
        assert!(!cleared.daily_scores.contains_key(&day));
        assert!(Arc::ptr_eq(&cleared, &clear_score(&cleared, day, &habit)));
    }

    #[test]
    fn lock_flow_is_inert() {
        let state = empty();
        let day = date("2026-04-10");
        assert!(!is_locked(&state, day));
        assert!(Arc::ptr_eq(&state, &commit_if_needed(&state, day)));
    }
}
