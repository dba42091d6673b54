//! Pure state transitions.
//!
//! Every action takes the current snapshot and returns the next one. A no-op
//! hands back the very same `Arc`, so callers can detect "nothing changed"
//! with `Arc::ptr_eq`. Actions never touch the input snapshot; changed
//! collections are cloned through `Arc::make_mut` on a shallow copy.

mod categories;
mod folders;
mod habits;
mod lab;
pub(crate) mod ordering;
mod scores;
mod todos;
mod ui;

use crate::models::AppState;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub use categories::{add_category, delete_category, rename_category, reorder_categories};
pub use folders::{add_todo_folder, delete_todo_folder, rename_todo_folder, reorder_todo_folders};
pub use habits::{
    add_habit, delete_habit, move_habit, rename_habit, reorder_habits, set_habit_priority, set_habit_start_date,
};
pub use lab::{
    add_lab_event, add_lab_project, add_lab_tag, delete_lab_event, delete_lab_project, delete_lab_tag,
    rename_lab_project, reorder_lab_projects, reorder_lab_tags, set_lab_daily_log,
};
pub use scores::{clear_score, commit_if_needed, is_locked, set_score};
pub use todos::{
    add_todo, complete_todo, delete_archive_item, delete_todo, reorder_todos, restore_todo, set_todo_folder,
    set_todo_quadrant, update_todo_text,
};
pub use ui::{set_daily_view_mode, set_overview_end_date, set_overview_range_days, set_selected_date, set_todo_view_mode};

pub type Snapshot = Arc<AppState>;

/// Result of an `add*` action: the next snapshot plus the new id, `None` when
/// the action was a no-op.
pub type Added = (Snapshot, Option<String>);

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Trimmed, whitespace-collapsed display name; `None` when blank.
pub(crate) fn normalize_name(input: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(input.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Case-insensitive name match, Unicode-aware.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub(crate) fn normalize_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn unchanged(state: &Snapshot) -> Snapshot {
    Arc::clone(state)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn empty() -> Snapshot {
        Arc::new(AppState::new("test"))
    }

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    pub fn added(result: Added) -> (Snapshot, String) {
        let (state, id) = result;
        (state, id.expect("action created an entity"))
    }
}
