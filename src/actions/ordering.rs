use crate::models::{Category, Habit, TodoFolder, TodoItem};
use std::collections::{BTreeMap, HashSet};

/// Entities carrying a dense `sortIndex` within some partition.
pub(crate) trait Ordered {
    fn order_key(&self) -> Option<u32>;
    fn set_order(&mut self, index: u32);
}

impl Ordered for Category {
    fn order_key(&self) -> Option<u32> {
        Some(self.sort_index)
    }

    fn set_order(&mut self, index: u32) {
        self.sort_index = index;
    }
}

impl Ordered for Habit {
    fn order_key(&self) -> Option<u32> {
        Some(self.sort_index)
    }

    fn set_order(&mut self, index: u32) {
        self.sort_index = index;
    }
}

impl Ordered for TodoItem {
    fn order_key(&self) -> Option<u32> {
        self.sort_index
    }

    fn set_order(&mut self, index: u32) {
        self.sort_index = Some(index);
    }
}

impl Ordered for TodoFolder {
    fn order_key(&self) -> Option<u32> {
        Some(self.sort_index)
    }

    fn set_order(&mut self, index: u32) {
        self.sort_index = index;
    }
}

/// Ids in scope ordered by current index. Missing indices sort last, ties keep
/// map (id) order.
pub(crate) fn sorted_ids<T, F>(items: &BTreeMap<String, T>, in_scope: F) -> Vec<String>
where
    T: Ordered,
    F: Fn(&T) -> bool,
{
    let mut keyed: Vec<(u32, &String)> = items
        .iter()
        .filter(|(_, item)| in_scope(item))
        .map(|(id, item)| (item.order_key().unwrap_or(u32::MAX), id))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, id)| id.clone()).collect()
}

/// Requested ids first (unknown and duplicate ids dropped), then the rest of
/// `current` in its existing order.
pub(crate) fn reorder_ids(current: &[String], requested: &[String]) -> Vec<String> {
    let known: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut next = Vec::with_capacity(current.len());
    for id in requested {
        if known.contains(id.as_str()) && seen.insert(id.as_str()) {
            next.push(id.clone());
        }
    }
    for id in current {
        if !seen.contains(id.as_str()) {
            next.push(id.clone());
        }
    }
    next
}

/// Writes `0..N-1` following `order`. Returns whether any index changed.
pub(crate) fn assign_order<T: Ordered>(items: &mut BTreeMap<String, T>, order: &[String]) -> bool {
    let mut changed = false;
    for (index, id) in order.iter().enumerate() {
        let index = index as u32;
        if let Some(item) = items.get_mut(id) {
            if item.order_key() != Some(index) {
                item.set_order(index);
                changed = true;
            }
        }
    }
    changed
}

/// Full renormalization pass over the members selected by `in_scope`.
pub(crate) fn renormalize<T, F>(items: &mut BTreeMap<String, T>, in_scope: F) -> bool
where
    T: Ordered,
    F: Fn(&T) -> bool,
{
    let order = sorted_ids(items, in_scope);
    assign_order(items, &order)
}

/// Would applying `requested` to the scope change anything?
pub(crate) fn reorder_changes<T, F>(items: &BTreeMap<String, T>, requested: &[String], in_scope: F) -> Option<Vec<String>>
where
    T: Ordered,
    F: Fn(&T) -> bool,
{
    let current = sorted_ids(items, in_scope);
    let next = reorder_ids(&current, requested);
    let dirty = next
        .iter()
        .enumerate()
        .any(|(index, id)| items.get(id).and_then(Ordered::order_key) != Some(index as u32));
    dirty.then_some(next)
}
