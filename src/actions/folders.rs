use super::ordering::{assign_order, renormalize, reorder_changes};
use super::{normalize_name, unchanged, Added, Snapshot};
use crate::ids;
use crate::models::TodoFolder;
use std::sync::Arc;

pub fn add_todo_folder(state: &Snapshot, name: &str) -> Added {
    let Some(name) = normalize_name(name) else {
        return (unchanged(state), None);
    };

    let id = ids::new_id();
    let mut next = (**state).clone();
    let folders = Arc::make_mut(&mut next.todo_folders);
    renormalize(folders, |_| true);
    let sort_index = folders.len() as u32;
    folders.insert(
        id.clone(),
        TodoFolder {
            id: id.clone(),
            name,
            sort_index,
        },
    );

    (Arc::new(next), Some(id))
}

pub fn rename_todo_folder(state: &Snapshot, folder_id: &str, name: &str) -> Snapshot {
    let Some(name) = normalize_name(name) else {
        return unchanged(state);
    };
    match state.todo_folders.get(folder_id) {
        Some(folder) if folder.name != name => {}
        _ => return unchanged(state),
    }

    let mut next = (**state).clone();
    if let Some(folder) = Arc::make_mut(&mut next.todo_folders).get_mut(folder_id) {
        folder.name = name;
    }
    Arc::new(next)
}

/// Deletes a folder. Its todos and archive entries fall back to "no folder";
/// nothing else is removed.
pub fn delete_todo_folder(state: &Snapshot, folder_id: &str) -> Snapshot {
    if !state.todo_folders.contains_key(folder_id) {
        return unchanged(state);
    }

    let mut next = (**state).clone();
    let folders = Arc::make_mut(&mut next.todo_folders);
    folders.remove(folder_id);
    renormalize(folders, |_| true);

    let in_folder = |candidate: &Option<String>| candidate.as_deref() == Some(folder_id);
    if state.todos.values().any(|todo| in_folder(&todo.folder_id)) {
        let now = ids::now();
        for todo in Arc::make_mut(&mut next.todos).values_mut() {
            if in_folder(&todo.folder_id) {
                todo.folder_id = None;
                todo.updated_at = now;
            }
        }
    }
    if state.todo_archive.values().any(|entry| in_folder(&entry.folder_id)) {
        for entry in Arc::make_mut(&mut next.todo_archive).values_mut() {
            if in_folder(&entry.folder_id) {
                entry.folder_id = None;
            }
        }
    }

    Arc::new(next)
}

pub fn reorder_todo_folders(state: &Snapshot, ids: &[String]) -> Snapshot {
    let Some(order) = reorder_changes(&state.todo_folders, ids, |_| true) else {
        return unchanged(state);
    };

    let mut next = (**state).clone();
    assign_order(Arc::make_mut(&mut next.todo_folders), &order);
    Arc::new(next)
}
