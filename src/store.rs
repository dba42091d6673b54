//! The single owner of the current snapshot.
//!
//! Every method runs one pure action, then commits: persist, swap, notify.
//! Listeners only ever see snapshots that are already in storage.

use crate::actions::{self, Added, Snapshot};
use crate::errors::AppResult;
use crate::models::{DailyViewMode, Priority, Quadrant, Score, TodoViewMode};
use crate::persistence::PersistenceAdapter;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;

pub type Listener = Box<dyn Fn(&Snapshot)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Store {
    state: Snapshot,
    persistence: PersistenceAdapter,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.persistence.backend())
            .field("key", &self.persistence.key())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Store {
    pub fn open(persistence: PersistenceAdapter) -> AppResult<Self> {
        let state = Arc::new(persistence.load_state()?);
        tracing::info!(
            backend = persistence.backend(),
            key = %persistence.key(),
            "store opened"
        );
        Ok(Self {
            state,
            persistence,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn get_state(&self) -> Snapshot {
        Arc::clone(&self.state)
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Snapshot) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Commits `next`. Returns `false` without persisting or notifying when
    /// it is the current snapshot. A failed save leaves the current snapshot
    /// in place.
    pub fn set_state(&mut self, next: Snapshot) -> AppResult<bool> {
        self.commit("setState", next)
    }

    fn commit(&mut self, action: &'static str, next: Snapshot) -> AppResult<bool> {
        if Arc::ptr_eq(&self.state, &next) {
            tracing::trace!(action, "action was a no-op");
            return Ok(false);
        }
        if let Err(error) = self.persistence.save_state(&next) {
            tracing::warn!(action, error = %error, "failed to persist state; keeping previous snapshot");
            return Err(error);
        }
        self.state = next;
        tracing::debug!(action, listeners = self.listeners.len(), "committed state");
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
        Ok(true)
    }

    fn commit_added(&mut self, action: &'static str, (next, id): Added) -> AppResult<Option<String>> {
        self.commit(action, next)?;
        Ok(id)
    }

    pub fn add_category(&mut self, name: &str) -> AppResult<Option<String>> {
        let result = actions::add_category(&self.state, name);
        self.commit_added("addCategory", result)
    }

    pub fn rename_category(&mut self, category_id: &str, name: &str) -> AppResult<()> {
        let next = actions::rename_category(&self.state, category_id, name);
        self.commit("renameCategory", next).map(drop)
    }

    pub fn delete_category(&mut self, category_id: &str) -> AppResult<()> {
        let next = actions::delete_category(&self.state, category_id);
        self.commit("deleteCategory", next).map(drop)
    }

    pub fn reorder_categories(&mut self, ids: &[String]) -> AppResult<()> {
        let next = actions::reorder_categories(&self.state, ids);
        self.commit("reorderCategories", next).map(drop)
    }

    pub fn add_habit(&mut self, category_id: &str, name: &str, priority: Priority) -> AppResult<Option<String>> {
        let result = actions::add_habit(&self.state, category_id, name, priority);
        self.commit_added("addHabit", result)
    }

    pub fn rename_habit(&mut self, habit_id: &str, name: &str) -> AppResult<()> {
        let next = actions::rename_habit(&self.state, habit_id, name);
        self.commit("renameHabit", next).map(drop)
    }

    pub fn set_habit_priority(&mut self, habit_id: &str, priority: Priority) -> AppResult<()> {
        let next = actions::set_habit_priority(&self.state, habit_id, priority);
        self.commit("setHabitPriority", next).map(drop)
    }

    pub fn set_habit_start_date(&mut self, habit_id: &str, start_date: Option<NaiveDate>) -> AppResult<()> {
        let next = actions::set_habit_start_date(&self.state, habit_id, start_date);
        self.commit("setHabitStartDate", next).map(drop)
    }

    pub fn delete_habit(&mut self, habit_id: &str) -> AppResult<()> {
        let next = actions::delete_habit(&self.state, habit_id);
        self.commit("deleteHabit", next).map(drop)
    }

    pub fn move_habit(
        &mut self,
        habit_id: &str,
        target_category_id: &str,
        target_index: Option<usize>,
    ) -> AppResult<()> {
        let next = actions::move_habit(&self.state, habit_id, target_category_id, target_index);
        self.commit("moveHabit", next).map(drop)
    }

    pub fn reorder_habits(&mut self, category_id: &str, ids: &[String]) -> AppResult<()> {
        let next = actions::reorder_habits(&self.state, category_id, ids);
        self.commit("reorderHabits", next).map(drop)
    }

    pub fn set_score(&mut self, date: NaiveDate, habit_id: &str, score: Score) -> AppResult<()> {
        let next = actions::set_score(&self.state, date, habit_id, score)?;
        self.commit("setScore", next).map(drop)
    }

    pub fn clear_score(&mut self, date: NaiveDate, habit_id: &str) -> AppResult<()> {
        let next = actions::clear_score(&self.state, date, habit_id);
        self.commit("clearScore", next).map(drop)
    }

    pub fn is_locked(&self, date: NaiveDate) -> bool {
        actions::is_locked(&self.state, date)
    }

    pub fn commit_if_needed(&mut self, date: NaiveDate) -> AppResult<()> {
        let next = actions::commit_if_needed(&self.state, date);
        self.commit("commitIfNeeded", next).map(drop)
    }

    pub fn add_todo(&mut self, text: &str, folder_id: Option<&str>) -> AppResult<Option<String>> {
        let result = actions::add_todo(&self.state, text, folder_id);
        self.commit_added("addTodo", result)
    }

    pub fn update_todo_text(&mut self, todo_id: &str, text: &str) -> AppResult<()> {
        let next = actions::update_todo_text(&self.state, todo_id, text);
        self.commit("updateTodoText", next).map(drop)
    }

    /// Returns the id of the new archive entry.
    pub fn complete_todo(&mut self, todo_id: &str) -> AppResult<Option<String>> {
        let result = actions::complete_todo(&self.state, todo_id);
        self.commit_added("completeTodo", result)
    }

    /// Returns the id of the recreated todo.
    pub fn restore_todo(&mut self, archive_id: &str) -> AppResult<Option<String>> {
        let result = actions::restore_todo(&self.state, archive_id);
        self.commit_added("restoreTodo", result)
    }

    pub fn delete_todo(&mut self, todo_id: &str) -> AppResult<()> {
        let next = actions::delete_todo(&self.state, todo_id);
        self.commit("deleteTodo", next).map(drop)
    }

    pub fn delete_archive_item(&mut self, archive_id: &str) -> AppResult<()> {
        let next = actions::delete_archive_item(&self.state, archive_id);
        self.commit("deleteArchiveItem", next).map(drop)
    }

    pub fn reorder_todos(&mut self, ids: &[String]) -> AppResult<()> {
        let next = actions::reorder_todos(&self.state, ids);
        self.commit("reorderTodos", next).map(drop)
    }

    pub fn set_todo_folder(&mut self, todo_id: &str, folder_id: Option<&str>) -> AppResult<()> {
        let next = actions::set_todo_folder(&self.state, todo_id, folder_id);
        self.commit("setTodoFolder", next).map(drop)
    }

    pub fn set_todo_quadrant(&mut self, todo_id: &str, quadrant: Option<Quadrant>) -> AppResult<()> {
        let next = actions::set_todo_quadrant(&self.state, todo_id, quadrant);
        self.commit("setTodoQuadrant", next).map(drop)
    }

    pub fn add_todo_folder(&mut self, name: &str) -> AppResult<Option<String>> {
        let result = actions::add_todo_folder(&self.state, name);
        self.commit_added("addTodoFolder", result)
    }

    pub fn rename_todo_folder(&mut self, folder_id: &str, name: &str) -> AppResult<()> {
        let next = actions::rename_todo_folder(&self.state, folder_id, name);
        self.commit("renameTodoFolder", next).map(drop)
    }

    pub fn delete_todo_folder(&mut self, folder_id: &str) -> AppResult<()> {
        let next = actions::delete_todo_folder(&self.state, folder_id);
        self.commit("deleteTodoFolder", next).map(drop)
    }

    pub fn reorder_todo_folders(&mut self, ids: &[String]) -> AppResult<()> {
        let next = actions::reorder_todo_folders(&self.state, ids);
        self.commit("reorderTodoFolders", next).map(drop)
    }

    pub fn set_selected_date(&mut self, date: NaiveDate) -> AppResult<()> {
        let next = actions::set_selected_date(&self.state, date);
        self.commit("setSelectedDate", next).map(drop)
    }

    pub fn set_daily_view_mode(&mut self, mode: DailyViewMode) -> AppResult<()> {
        let next = actions::set_daily_view_mode(&self.state, mode);
        self.commit("setDailyViewMode", next).map(drop)
    }

    pub fn set_todo_view_mode(&mut self, mode: TodoViewMode) -> AppResult<()> {
        let next = actions::set_todo_view_mode(&self.state, mode);
        self.commit("setTodoViewMode", next).map(drop)
    }

    pub fn set_overview_range_days(&mut self, days: u32) -> AppResult<()> {
        let next = actions::set_overview_range_days(&self.state, days);
        self.commit("setOverviewRangeDays", next).map(drop)
    }

    pub fn set_overview_end_date(&mut self, end_date: Option<NaiveDate>) -> AppResult<()> {
        let next = actions::set_overview_end_date(&self.state, end_date);
        self.commit("setOverviewEndDate", next).map(drop)
    }

    pub fn add_lab_project(&mut self, name: &str) -> AppResult<Option<String>> {
        let result = actions::add_lab_project(&self.state, name);
        self.commit_added("addLabProject", result)
    }

    pub fn rename_lab_project(&mut self, project_id: &str, name: &str) -> AppResult<()> {
        let next = actions::rename_lab_project(&self.state, project_id, name);
        self.commit("renameLabProject", next).map(drop)
    }

    pub fn delete_lab_project(&mut self, project_id: &str) -> AppResult<()> {
        let next = actions::delete_lab_project(&self.state, project_id);
        self.commit("deleteLabProject", next).map(drop)
    }

    pub fn reorder_lab_projects(&mut self, ids: &[String]) -> AppResult<()> {
        let next = actions::reorder_lab_projects(&self.state, ids);
        self.commit("reorderLabProjects", next).map(drop)
    }

    pub fn add_lab_tag(&mut self, project_id: &str, name: &str, color: Option<&str>) -> AppResult<Option<String>> {
        let result = actions::add_lab_tag(&self.state, project_id, name, color);
        self.commit_added("addLabTag", result)
    }

    pub fn delete_lab_tag(&mut self, project_id: &str, tag_id: &str) -> AppResult<()> {
        let next = actions::delete_lab_tag(&self.state, project_id, tag_id);
        self.commit("deleteLabTag", next).map(drop)
    }

    pub fn reorder_lab_tags(&mut self, project_id: &str, ids: &[String]) -> AppResult<()> {
        let next = actions::reorder_lab_tags(&self.state, project_id, ids);
        self.commit("reorderLabTags", next).map(drop)
    }

    pub fn set_lab_daily_log(
        &mut self,
        project_id: &str,
        date: NaiveDate,
        tag_ids: &[String],
        note: &str,
    ) -> AppResult<()> {
        let next = actions::set_lab_daily_log(&self.state, project_id, date, tag_ids, note);
        self.commit("setLabDailyLog", next).map(drop)
    }

    pub fn add_lab_event(
        &mut self,
        project_id: &str,
        title: &str,
        occurred_at: DateTime<Utc>,
        tag_ids: &[String],
    ) -> AppResult<Option<String>> {
        let result = actions::add_lab_event(&self.state, project_id, title, occurred_at, tag_ids);
        self.commit_added("addLabEvent", result)
    }

    pub fn delete_lab_event(&mut self, project_id: &str, event_id: &str) -> AppResult<()> {
        let next = actions::delete_lab_event(&self.state, project_id, event_id);
        self.commit("deleteLabEvent", next).map(drop)
    }
}
