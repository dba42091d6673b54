//! Lab: per-project tag vocabularies with daily logs and timestamped events.
//!
//! Unlike the top-level collections, lab ordering lives in explicit id lists
//! (`projectOrder`, `tagOrderByProject`) rather than per-record indices.

use super::ordering::reorder_ids;
use super::{normalize_name, normalize_text, same_name, unchanged, Added, Snapshot};
use crate::ids;
use crate::models::{LabDailyLog, LabEventLog, LabProject, LabState, LabTag};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub fn add_lab_project(state: &Snapshot, name: &str) -> Added {
    let Some(name) = normalize_name(name) else {
        return (unchanged(state), None);
    };

    let now = ids::now();
    let id = ids::new_id();
    let mut next = (**state).clone();
    let lab = Arc::make_mut(&mut next.lab);
    lab.projects.insert(
        id.clone(),
        LabProject {
            id: id.clone(),
            name,
            created_at: now,
            updated_at: now,
        },
    );
    lab.project_order.push(id.clone());
    lab.tags_by_project.insert(id.clone(), BTreeMap::new());
    lab.tag_order_by_project.insert(id.clone(), Vec::new());
    lab.daily_logs_by_project.insert(id.clone(), BTreeMap::new());
    lab.event_logs_by_project.insert(id.clone(), Vec::new());

    (Arc::new(next), Some(id))
}

pub fn rename_lab_project(state: &Snapshot, project_id: &str, name: &str) -> Snapshot {
    let Some(name) = normalize_name(name) else {
        return unchanged(state);
    };
    match state.lab.projects.get(project_id) {
        Some(project) if project.name != name => {}
        _ => return unchanged(state),
    }

    update_lab(state, |lab| {
        if let Some(project) = lab.projects.get_mut(project_id) {
            project.name = name;
            project.updated_at = ids::now();
        }
    })
}

/// Removes the project with its tags, daily logs and events.
pub fn delete_lab_project(state: &Snapshot, project_id: &str) -> Snapshot {
    if !state.lab.projects.contains_key(project_id) {
        return unchanged(state);
    }

    update_lab(state, |lab| {
        lab.projects.remove(project_id);
        lab.project_order.retain(|id| id != project_id);
        lab.tags_by_project.remove(project_id);
        lab.tag_order_by_project.remove(project_id);
        lab.daily_logs_by_project.remove(project_id);
        lab.event_logs_by_project.remove(project_id);
    })
}

pub fn reorder_lab_projects(state: &Snapshot, ids: &[String]) -> Snapshot {
    let order = reorder_ids(&state.lab.project_order, ids);
    if order == state.lab.project_order {
        return unchanged(state);
    }
    update_lab(state, |lab| lab.project_order = order)
}

/// Adds a tag to a project's vocabulary. A tag name already used in the
/// project (case-insensitive) is a no-op.
pub fn add_lab_tag(state: &Snapshot, project_id: &str, name: &str, color: Option<&str>) -> Added {
    if !state.lab.projects.contains_key(project_id) {
        return (unchanged(state), None);
    }
    let Some(name) = normalize_name(name) else {
        return (unchanged(state), None);
    };
    let taken = state
        .lab
        .tags_by_project
        .get(project_id)
        .is_some_and(|tags| tags.values().any(|tag| same_name(&tag.name, &name)));
    if taken {
        return (unchanged(state), None);
    }

    let id = ids::new_id();
    let tag = LabTag {
        id: id.clone(),
        name,
        color: color.and_then(normalize_text),
    };
    let next = update_lab(state, |lab| {
        lab.tags_by_project
            .entry(project_id.to_string())
            .or_default()
            .insert(id.clone(), tag);
        lab.tag_order_by_project
            .entry(project_id.to_string())
            .or_default()
            .push(id.clone());
    });
    (next, Some(id))
}

/// Removes a tag and strips it from every daily log and event of the
/// project. Logs left with no tags and no note disappear.
pub fn delete_lab_tag(state: &Snapshot, project_id: &str, tag_id: &str) -> Snapshot {
    let known = state
        .lab
        .tags_by_project
        .get(project_id)
        .is_some_and(|tags| tags.contains_key(tag_id));
    if !known {
        return unchanged(state);
    }

    update_lab(state, |lab| {
        if let Some(tags) = lab.tags_by_project.get_mut(project_id) {
            tags.remove(tag_id);
        }
        if let Some(order) = lab.tag_order_by_project.get_mut(project_id) {
            order.retain(|id| id != tag_id);
        }
        if let Some(logs) = lab.daily_logs_by_project.get_mut(project_id) {
            logs.retain(|_, log| {
                log.tag_ids.retain(|id| id != tag_id);
                !log.tag_ids.is_empty() || !log.note.is_empty()
            });
        }
        if let Some(events) = lab.event_logs_by_project.get_mut(project_id) {
            for event in events.iter_mut() {
                event.tag_ids.retain(|id| id != tag_id);
            }
        }
    })
}

pub fn reorder_lab_tags(state: &Snapshot, project_id: &str, ids: &[String]) -> Snapshot {
    let Some(current) = state.lab.tag_order_by_project.get(project_id) else {
        return unchanged(state);
    };
    let order = reorder_ids(current, ids);
    if &order == current {
        return unchanged(state);
    }
    update_lab(state, |lab| {
        lab.tag_order_by_project.insert(project_id.to_string(), order);
    })
}

/// Writes the log for one project day. Unknown tag ids are dropped; a log
/// with no tags and a blank note is removed instead of stored.
pub fn set_lab_daily_log(
    state: &Snapshot,
    project_id: &str,
    date: NaiveDate,
    tag_ids: &[String],
    note: &str,
) -> Snapshot {
    if !state.lab.projects.contains_key(project_id) {
        return unchanged(state);
    }
    let tag_ids = known_tags(&state.lab, project_id, tag_ids);
    let note = note.trim().to_string();
    let existing = state
        .lab
        .daily_logs_by_project
        .get(project_id)
        .and_then(|logs| logs.get(&date));

    if tag_ids.is_empty() && note.is_empty() {
        if existing.is_none() {
            return unchanged(state);
        }
        return update_lab(state, |lab| {
            if let Some(logs) = lab.daily_logs_by_project.get_mut(project_id) {
                logs.remove(&date);
            }
        });
    }

    if existing.is_some_and(|log| log.tag_ids == tag_ids && log.note == note) {
        return unchanged(state);
    }
    let log = LabDailyLog {
        date,
        tag_ids,
        note,
        updated_at: ids::now(),
    };
    update_lab(state, |lab| {
        lab.daily_logs_by_project
            .entry(project_id.to_string())
            .or_default()
            .insert(date, log);
    })
}

/// Records an event. Events stay sorted by `occurredAt`; equal timestamps
/// keep insertion order.
pub fn add_lab_event(
    state: &Snapshot,
    project_id: &str,
    title: &str,
    occurred_at: DateTime<Utc>,
    tag_ids: &[String],
) -> Added {
    if !state.lab.projects.contains_key(project_id) {
        return (unchanged(state), None);
    }
    let Some(title) = normalize_text(title) else {
        return (unchanged(state), None);
    };

    let id = ids::new_id();
    let event = LabEventLog {
        id: id.clone(),
        title,
        occurred_at,
        tag_ids: known_tags(&state.lab, project_id, tag_ids),
    };
    let next = update_lab(state, |lab| {
        let events = lab.event_logs_by_project.entry(project_id.to_string()).or_default();
        let position = events.partition_point(|other| other.occurred_at <= occurred_at);
        events.insert(position, event);
    });
    (next, Some(id))
}

pub fn delete_lab_event(state: &Snapshot, project_id: &str, event_id: &str) -> Snapshot {
    let known = state
        .lab
        .event_logs_by_project
        .get(project_id)
        .is_some_and(|events| events.iter().any(|event| event.id == event_id));
    if !known {
        return unchanged(state);
    }

    update_lab(state, |lab| {
        if let Some(events) = lab.event_logs_by_project.get_mut(project_id) {
            events.retain(|event| event.id != event_id);
        }
    })
}

/// Known tags of the project in request order, duplicates removed.
fn known_tags(lab: &LabState, project_id: &str, requested: &[String]) -> Vec<String> {
    let Some(tags) = lab.tags_by_project.get(project_id) else {
        return Vec::new();
    };
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::new();
    for id in requested {
        if tags.contains_key(id) && seen.insert(id.as_str()) {
            kept.push(id.clone());
        }
    }
    kept
}

fn update_lab<F>(state: &Snapshot, apply: F) -> Snapshot
where
    F: FnOnce(&mut LabState),
{
    let mut next = (**state).clone();
    apply(Arc::make_mut(&mut next.lab));
    Arc::new(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{added, date, empty};
    use chrono::TimeZone;

    fn project_with_tags() -> (Snapshot, String, Vec<String>) {
        let (mut state, project) = added(add_lab_project(&empty(), "Sleep study"));
        let mut tags = Vec::new();
        for (name, color) in [("caffeine", Some("#aa5500")), ("late screen", None), ("exercise", Some(" "))] {
            let (next, tag) = added(add_lab_tag(&state, &project, name, color));
            state = next;
            tags.push(tag);
        }
        (state, project, tags)
    }

    #[test]
    fn new_project_gets_empty_sub_collections() {
        let (state, project) = added(add_lab_project(&empty(), "Sleep study"));
        assert_eq!(state.lab.project_order, vec![project.clone()]);
        assert!(state.lab.tags_by_project[&project].is_empty());
        assert!(state.lab.event_logs_by_project[&project].is_empty());
    }

    #[test]
    fn tags_keep_order_and_reject_duplicate_names() {
        let (state, project, tags) = project_with_tags();
        assert_eq!(state.lab.tag_order_by_project[&project], tags);
        assert_eq!(state.lab.tags_by_project[&project][&tags[0]].color.as_deref(), Some("#aa5500"));
        assert_eq!(state.lab.tags_by_project[&project][&tags[2]].color, None);

        let (same, id) = add_lab_tag(&state, &project, "Caffeine", None);
        assert!(id.is_none());
        assert!(Arc::ptr_eq(&state, &same));
    }

    #[test]
    fn duplicate_tag_check_folds_non_ascii_case() {
        let (state, project, _) = project_with_tags();
        let (state, _) = added(add_lab_tag(&state, &project, "Ärger", None));
        let (same, id) = add_lab_tag(&state, &project, "  äRGER ", None);
        assert!(id.is_none());
        assert!(Arc::ptr_eq(&state, &same));
    }

    #[test]
    fn daily_log_drops_unknown_tags_and_blank_log_removes_entry() {
        let (state, project, tags) = project_with_tags();
        let day = date("2026-06-01");
        let requested = vec![tags[1].clone(), "ghost".to_string(), tags[1].clone()];
        let state = set_lab_daily_log(&state, &project, day, &requested, " slept badly ");
        let log = &state.lab.daily_logs_by_project[&project][&day];
        assert_eq!(log.tag_ids, vec![tags[1].clone()]);
        assert_eq!(log.note, "slept badly");

        let again = set_lab_daily_log(&state, &project, day, &[tags[1].clone()], "slept badly");
        assert!(Arc::ptr_eq(&state, &again));

        let cleared = set_lab_daily_log(&state, &project, day, &[], "  ");
        assert!(!cleared.lab.daily_logs_by_project[&project].contains_key(&day));
    }

    #[test]
    fn deleting_a_tag_strips_it_everywhere() {
        let (state, project, tags) = project_with_tags();
        let day = date("2026-06-02");
        let state = set_lab_daily_log(&state, &project, day, &[tags[0].clone()], "");
        let at = Utc.with_ymd_and_hms(2026, 6, 2, 21, 0, 0).single().expect("timestamp");
        let (state, event) = added(add_lab_event(&state, &project, "Espresso", at, &tags[..2]));

        let state = delete_lab_tag(&state, &project, &tags[0]);

        assert!(!state.lab.tags_by_project[&project].contains_key(&tags[0]));
        assert_eq!(state.lab.tag_order_by_project[&project], tags[1..].to_vec());
        assert!(!state.lab.daily_logs_by_project[&project].contains_key(&day));
        let stored = &state.lab.event_logs_by_project[&project];
        assert_eq!(stored[0].id, event);
        assert_eq!(stored[0].tag_ids, vec![tags[1].clone()]);
    }

    #[test]
    fn events_are_kept_in_time_order() {
        let (state, project, _) = project_with_tags();
        let late = Utc.with_ymd_and_hms(2026, 6, 3, 22, 0, 0).single().expect("timestamp");
        let early = Utc.with_ymd_and_hms(2026, 6, 3, 7, 0, 0).single().expect("timestamp");
        let (state, second) = added(add_lab_event(&state, &project, "Late snack", late, &[]));
        let (state, first) = added(add_lab_event(&state, &project, "Run", early, &[]));
        let ids: Vec<&str> = state.lab.event_logs_by_project[&project]
            .iter()
            .map(|event| event.id.as_str())
            .collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);

        let state = delete_lab_event(&state, &project, &first);
        assert_eq!(state.lab.event_logs_by_project[&project].len(), 1);
        assert!(Arc::ptr_eq(&state, &delete_lab_event(&state, &project, &first)));
    }

    #[test]
    fn delete_project_cascades_and_reorder_follows_shared_rule() {
        let (state, a) = added(add_lab_project(&empty(), "A"));
        let (state, b) = added(add_lab_project(&state, "B"));
        let (state, c) = added(add_lab_project(&state, "C"));

        let state = reorder_lab_projects(&state, &[c.clone(), "ghost".to_string()]);
        assert_eq!(state.lab.project_order, vec![c.clone(), a.clone(), b.clone()]);
        assert!(Arc::ptr_eq(&state, &reorder_lab_projects(&state, &[c.clone()])));

        let state = delete_lab_project(&state, &a);
        assert_eq!(state.lab.project_order, vec![c, b]);
        assert!(!state.lab.tags_by_project.contains_key(&a));
        assert!(!state.lab.daily_logs_by_project.contains_key(&a));
    }

    #[test]
    fn reorder_tags_within_project() {
        let (state, project, tags) = project_with_tags();
        let state = reorder_lab_tags(&state, &project, &[tags[2].clone()]);
        assert_eq!(
            state.lab.tag_order_by_project[&project],
            vec![tags[2].clone(), tags[0].clone(), tags[1].clone()]
        );
        assert!(Arc::ptr_eq(&state, &reorder_lab_tags(&state, "ghost", &tags)));
    }

    #[test]
    fn lab_changes_keep_habit_collections_shared() {
        let state = empty();
        let (next, _) = added(add_lab_project(&state, "Sleep study"));
        assert!(Arc::ptr_eq(&state.habits, &next.habits));
        assert!(Arc::ptr_eq(&state.daily_scores, &next.daily_scores));
    }
}
