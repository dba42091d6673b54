use super::{unchanged, Snapshot};
use crate::models::{DailyViewMode, TodoViewMode, UiState, MAX_OVERVIEW_RANGE_DAYS};
use chrono::NaiveDate;
use std::sync::Arc;

pub fn set_selected_date(state: &Snapshot, date: NaiveDate) -> Snapshot {
    update_ui(state, |ui| {
        if ui.selected_date == date {
            return false;
        }
        ui.selected_date = date;
        true
    })
}

pub fn set_daily_view_mode(state: &Snapshot, mode: DailyViewMode) -> Snapshot {
    update_ui(state, |ui| {
        if ui.daily_view_mode == mode {
            return false;
        }
        ui.daily_view_mode = mode;
        true
    })
}

pub fn set_todo_view_mode(state: &Snapshot, mode: TodoViewMode) -> Snapshot {
    update_ui(state, |ui| {
        if ui.todo_view_mode == mode {
            return false;
        }
        ui.todo_view_mode = mode;
        true
    })
}

/// Clamped to `1..=366`.
pub fn set_overview_range_days(state: &Snapshot, days: u32) -> Snapshot {
    let days = days.clamp(1, MAX_OVERVIEW_RANGE_DAYS);
    update_ui(state, |ui| {
        if ui.overview_range_days == days {
            return false;
        }
        ui.overview_range_days = days;
        true
    })
}

pub fn set_overview_end_date(state: &Snapshot, end_date: Option<NaiveDate>) -> Snapshot {
    update_ui(state, |ui| {
        if ui.overview_end_date == end_date {
            return false;
        }
        ui.overview_end_date = end_date;
        true
    })
}

fn update_ui<F>(state: &Snapshot, apply: F) -> Snapshot
where
    F: FnOnce(&mut UiState) -> bool,
{
    let mut ui = state.ui_state.clone();
    if !apply(&mut ui) {
        return unchanged(state);
    }
    let mut next = (**state).clone();
    next.ui_state = ui;
    Arc::new(next)
}
