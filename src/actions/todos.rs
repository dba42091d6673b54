use super::ordering::{assign_order, renormalize, reorder_changes};
use super::{normalize_text, unchanged, Added, Snapshot};
use crate::ids;
use crate::models::{Quadrant, TodoArchiveItem, TodoItem};
use std::sync::Arc;

pub fn add_todo(state: &Snapshot, text: &str, folder_id: Option<&str>) -> Added {
    let Some(text) = normalize_text(text) else {
        return (unchanged(state), None);
    };
    if let Some(folder_id) = folder_id {
        if !state.todo_folders.contains_key(folder_id) {
            return (unchanged(state), None);
        }
    }

    let mut next = (**state).clone();
    let id = push_todo(
        Arc::make_mut(&mut next.todos),
        text,
        folder_id.map(str::to_string),
        None,
    );
    (Arc::new(next), Some(id))
}

pub fn update_todo_text(state: &Snapshot, todo_id: &str, text: &str) -> Snapshot {
    let Some(text) = normalize_text(text) else {
        return unchanged(state);
    };
    update_todo(state, todo_id, |todo| {
        if todo.text == text {
            return false;
        }
        todo.text = text;
        true
    })
}

/// Moves a todo into the archive. Returns the archive entry id.
pub fn complete_todo(state: &Snapshot, todo_id: &str) -> Added {
    let Some(todo) = state.todos.get(todo_id) else {
        return (unchanged(state), None);
    };

    let archive_id = ids::new_id();
    let entry = TodoArchiveItem {
        id: archive_id.clone(),
        text: todo.text.clone(),
        completed_at: ids::now(),
        restored_at: None,
        folder_id: todo.folder_id.clone(),
        quadrant: todo.quadrant,
    };

    let mut next = (**state).clone();
    let todos = Arc::make_mut(&mut next.todos);
    todos.remove(todo_id);
    renormalize(todos, |_| true);
    Arc::make_mut(&mut next.todo_archive).insert(archive_id.clone(), entry);

    (Arc::new(next), Some(archive_id))
}

/// Brings an archived todo back as a brand-new todo. Unknown or already
/// restored entries are left alone. Returns the new todo id.
pub fn restore_todo(state: &Snapshot, archive_id: &str) -> Added {
    let Some(entry) = state.todo_archive.get(archive_id) else {
        return (unchanged(state), None);
    };
    if entry.is_restored() {
        return (unchanged(state), None);
    }

    let folder_id = entry
        .folder_id
        .clone()
        .filter(|folder_id| state.todo_folders.contains_key(folder_id));
    let text = entry.text.clone();
    let quadrant = entry.quadrant;

    let mut next = (**state).clone();
    let todo_id = push_todo(Arc::make_mut(&mut next.todos), text, folder_id, quadrant);
    if let Some(entry) = Arc::make_mut(&mut next.todo_archive).get_mut(archive_id) {
        entry.restored_at = Some(ids::now());
    }

    (Arc::new(next), Some(todo_id))
}

pub fn delete_todo(state: &Snapshot, todo_id: &str) -> Snapshot {
    if !state.todos.contains_key(todo_id) {
        return unchanged(state);
    }

    let mut next = (**state).clone();
    let todos = Arc::make_mut(&mut next.todos);
    todos.remove(todo_id);
    renormalize(todos, |_| true);
    Arc::new(next)
}

pub fn delete_archive_item(state: &Snapshot, archive_id: &str) -> Snapshot {
    if !state.todo_archive.contains_key(archive_id) {
        return unchanged(state);
    }

    let mut next = (**state).clone();
    Arc::make_mut(&mut next.todo_archive).remove(archive_id);
    Arc::new(next)
}

/// Applies a global todo order. Unknown ids are ignored; an order that changes
/// nothing returns the input snapshot.
pub fn reorder_todos(state: &Snapshot, ids: &[String]) -> Snapshot {
    if !ids.iter().any(|id| state.todos.contains_key(id)) {
        return unchanged(state);
    }
    let Some(order) = reorder_changes(&state.todos, ids, |_| true) else {
        return unchanged(state);
    };

    let mut next = (**state).clone();
    assign_order(Arc::make_mut(&mut next.todos), &order);
    Arc::new(next)
}

pub fn set_todo_folder(state: &Snapshot, todo_id: &str, folder_id: Option<&str>) -> Snapshot {
    if let Some(folder_id) = folder_id {
        if !state.todo_folders.contains_key(folder_id) {
            return unchanged(state);
        }
    }
    update_todo(state, todo_id, |todo| {
        if todo.folder_id.as_deref() == folder_id {
            return false;
        }
        todo.folder_id = folder_id.map(str::to_string);
        true
    })
}

pub fn set_todo_quadrant(state: &Snapshot, todo_id: &str, quadrant: Option<Quadrant>) -> Snapshot {
    update_todo(state, todo_id, |todo| {
        if todo.quadrant == quadrant {
            return false;
        }
        todo.quadrant = quadrant;
        true
    })
}

fn push_todo(
    todos: &mut std::collections::BTreeMap<String, TodoItem>,
    text: String,
    folder_id: Option<String>,
    quadrant: Option<Quadrant>,
) -> String {
    let now = ids::now();
    let id = ids::new_id();
    renormalize(todos, |_| true);
    let sort_index = todos.len() as u32;
    todos.insert(
        id.clone(),
        TodoItem {
            id: id.clone(),
            text,
            sort_index: Some(sort_index),
            folder_id,
            quadrant,
            created_at: now,
            updated_at: now,
        },
    );
    id
}

fn update_todo<F>(state: &Snapshot, todo_id: &str, apply: F) -> Snapshot
where
    F: FnOnce(&mut TodoItem) -> bool,
{
    let Some(current) = state.todos.get(todo_id) else {
        return unchanged(state);
    };
    let mut todo = current.clone();
    if !apply(&mut todo) {
        return unchanged(state);
    }
    todo.updated_at = ids::now();

    let mut next = (**state).clone();
    Arc::make_mut(&mut next.todos).insert(todo_id.to_string(), todo);
    Arc::new(next)
}
