//! Read-only views over a snapshot. Nothing here allocates state; results
//! borrow from the snapshot they were computed from.

use crate::actions::is_locked;
use crate::actions::ordering::Ordered;
use crate::models::{
    AppState, Category, DayScores, Habit, LabDailyLog, LabProject, LabTag, Quadrant, Score, TodoArchiveItem,
    TodoFolder, TodoItem,
};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

static NO_SCORES: DayScores = BTreeMap::new();

/// Inclusive date range shown by the overview grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl OverviewWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

pub fn is_date_locked(state: &AppState, date: NaiveDate) -> bool {
    is_locked(state, date)
}

pub fn scores_for_date(state: &AppState, date: NaiveDate) -> &DayScores {
    state.daily_scores.get(&date).unwrap_or(&NO_SCORES)
}

pub fn score_for(state: &AppState, date: NaiveDate, habit_id: &str) -> Option<Score> {
    scores_for_date(state, date).get(habit_id).copied()
}

/// Sum of score values recorded on `date`.
pub fn daily_total(state: &AppState, date: NaiveDate) -> u32 {
    scores_for_date(state, date)
        .values()
        .map(|score| u32::from(score.value()))
        .sum()
}

pub fn sorted_categories(state: &AppState) -> Vec<&Category> {
    by_index(&state.categories, |_| true)
}

pub fn habits_in_category<'a>(state: &'a AppState, category_id: &str) -> Vec<&'a Habit> {
    by_index(&state.habits, |habit| habit.category_id == category_id)
}

/// Habits that may be scored on `date`, in board order (category order, then
/// position within the category).
pub fn active_habits_on(state: &AppState, date: NaiveDate) -> Vec<&Habit> {
    let category_rank: HashMap<&str, u32> = state
        .categories
        .values()
        .map(|category| (category.id.as_str(), category.sort_index))
        .collect();
    let mut habits: Vec<&Habit> = state.habits.values().filter(|habit| habit.is_active_on(date)).collect();
    habits.sort_by_key(|habit| {
        (
            category_rank.get(habit.category_id.as_str()).copied().unwrap_or(u32::MAX),
            habit.sort_index,
        )
    });
    habits
}

pub fn sorted_todos(state: &AppState) -> Vec<&TodoItem> {
    by_index(&state.todos, |_| true)
}

/// `None` selects todos outside any folder.
pub fn todos_in_folder<'a>(state: &'a AppState, folder_id: Option<&str>) -> Vec<&'a TodoItem> {
    by_index(&state.todos, |todo| todo.folder_id.as_deref() == folder_id)
}

/// `None` selects todos not yet placed in the matrix.
pub fn todos_in_quadrant(state: &AppState, quadrant: Option<Quadrant>) -> Vec<&TodoItem> {
    by_index(&state.todos, |todo| todo.quadrant == quadrant)
}

pub fn sorted_todo_folders(state: &AppState) -> Vec<&TodoFolder> {
    by_index(&state.todo_folders, |_| true)
}

/// Archive entries not yet restored, most recently completed first.
pub fn pending_archive(state: &AppState) -> Vec<&TodoArchiveItem> {
    let mut pending: Vec<&TodoArchiveItem> = state
        .todo_archive
        .values()
        .filter(|entry| !entry.is_restored())
        .collect();
    pending.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then_with(|| a.id.cmp(&b.id)));
    pending
}

pub fn lab_projects(state: &AppState) -> Vec<&LabProject> {
    state
        .lab
        .project_order
        .iter()
        .filter_map(|id| state.lab.projects.get(id))
        .collect()
}

/// Tags of a project in display order; empty for an unknown project.
pub fn lab_tags<'a>(state: &'a AppState, project_id: &str) -> Vec<&'a LabTag> {
    let (Some(order), Some(tags)) = (
        state.lab.tag_order_by_project.get(project_id),
        state.lab.tags_by_project.get(project_id),
    ) else {
        return Vec::new();
    };
    order.iter().filter_map(|id| tags.get(id)).collect()
}

pub fn lab_daily_log<'a>(state: &'a AppState, project_id: &str, date: NaiveDate) -> Option<&'a LabDailyLog> {
    state
        .lab
        .daily_logs_by_project
        .get(project_id)
        .and_then(|logs| logs.get(&date))
}

pub fn overview_window(state: &AppState) -> OverviewWindow {
    let ui = &state.ui_state;
    let end = ui.overview_end_date.unwrap_or(ui.selected_date);
    let span = i64::from(ui.overview_range_days.max(1)) - 1;
    let start = end.checked_sub_signed(Duration::days(span)).unwrap_or(NaiveDate::MIN);
    OverviewWindow { start, end }
}

fn by_index<'a, T, F>(items: &'a BTreeMap<String, T>, in_scope: F) -> Vec<&'a T>
where
    T: Ordered,
    F: Fn(&T) -> bool,
{
    let mut selected: Vec<&T> = items.values().filter(|item| in_scope(item)).collect();
    selected.sort_by_key(|item| item.order_key().unwrap_or(u32::MAX));
    selected
}
