use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where an identifier sits in the order index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub parent: Option<String>,
    pub index: usize,
}

/// Structural shape of the questionnaire: root sequence plus one ordered
/// child sequence per parent.
///
/// Kept apart from item content so moves never touch the item store. Empty
/// child sequences are never stored, so two indexes describing the same tree
/// compare equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OrderIndex {
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub children: HashMap<String, Vec<String>>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children_of(&self, link_id: &str) -> &[String] {
        self.children
            .get(link_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn siblings(&self, parent: Option<&str>) -> &[String] {
        match parent {
            Some(parent) => self.children_of(parent),
            None => &self.roots,
        }
    }

    /// Find the sequence holding `link_id`. Scans every sequence, so it also
    /// works on indexes whose parent map is not a forest.
    pub fn locate(&self, link_id: &str) -> Option<Position> {
        if let Some(index) = self.roots.iter().position(|id| id == link_id) {
            return Some(Position {
                parent: None,
                index,
            });
        }
        self.children.iter().find_map(|(parent, children)| {
            children
                .iter()
                .position(|id| id == link_id)
                .map(|index| Position {
                    parent: Some(parent.clone()),
                    index,
                })
        })
    }

    pub fn contains(&self, link_id: &str) -> bool {
        self.locate(link_id).is_some()
    }

    /// Insert `link_id` under `parent` at `index` (clamped), or append.
    pub fn insert(&mut self, parent: Option<&str>, index: Option<usize>, link_id: impl Into<String>) {
        let sequence = match parent {
            Some(parent) => self.children.entry(parent.to_string()).or_default(),
            None => &mut self.roots,
        };
        let at = index.unwrap_or(sequence.len()).min(sequence.len());
        sequence.insert(at, link_id.into());
    }

    /// Remove `link_id` from the sequence that holds it. Its own children stay
    /// attached to it.
    pub fn detach(&mut self, link_id: &str) -> Option<Position> {
        let position = self.locate(link_id)?;
        match &position.parent {
            Some(parent) => {
                if let Some(children) = self.children.get_mut(parent) {
                    children.remove(position.index);
                    if children.is_empty() {
                        self.children.remove(parent);
                    }
                }
            }
            None => {
                self.roots.remove(position.index);
            }
        }
        Some(position)
    }

    /// All identifiers below `link_id` in pre-order, excluding `link_id`.
    pub fn descendants(&self, link_id: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(link_id);
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.children_of(link_id).iter().rev().map(String::as_str).collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            out.push(current.to_string());
            stack.extend(self.children_of(current).iter().rev().map(String::as_str));
        }
        out
    }

    pub fn is_descendant(&self, ancestor: &str, candidate: &str) -> bool {
        self.descendants(ancestor).iter().any(|id| id == candidate)
    }

    /// Detach `link_id` and drop the whole subtree below it. Returns every
    /// removed identifier, `link_id` first.
    pub fn remove_subtree(&mut self, link_id: &str) -> Vec<String> {
        let mut removed = vec![link_id.to_string()];
        removed.extend(self.descendants(link_id));
        self.detach(link_id);
        for id in &removed {
            self.children.remove(id);
        }
        removed
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        for id in self.roots.iter_mut().chain(self.children.values_mut().flatten()) {
            if id == old {
                *id = new.to_string();
            }
        }
        if let Some(children) = self.children.remove(old) {
            self.children.insert(new.to_string(), children);
        }
    }

    /// Identifiers reachable from the roots, in document order. Each identifier
    /// is yielded once even if the index is corrupted.
    pub fn preorder(&self) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.roots.iter().rev().map(String::as_str).collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            out.push(current.to_string());
            stack.extend(self.children_of(current).iter().rev().map(String::as_str));
        }
        out
    }

    /// Position directly after `link_id` in its own sequence.
    pub fn slot_after(&self, link_id: &str) -> Option<Position> {
        self.locate(link_id).map(|p| Position {
            parent: p.parent,
            index: p.index + 1,
        })
    }

    pub fn sibling_count(&self, parent: Option<&str>) -> usize {
        self.siblings(parent).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderIndex {
        let mut order = OrderIndex::new();
        order.insert(None, None, "a");
        order.insert(None, None, "b");
        order.insert(Some("a"), None, "a1");
        order.insert(Some("a"), None, "a2");
        order.insert(Some("a1"), None, "a1x");
        order
    }

    #[test]
    fn test_preorder_follows_sequence_order() {
        assert_eq!(sample().preorder(), vec!["a", "a1", "a1x", "a2", "b"]);
    }

    #[test]
    fn test_detach_drops_empty_child_lists() {
        let mut order = sample();
        order.detach("a1x");
        assert!(!order.children.contains_key("a1"));
        assert_eq!(
            order.detach("a2"),
            Some(Position {
                parent: Some("a".to_string()),
                index: 1
            })
        );
    }

    #[test]
    fn test_remove_subtree_returns_all_ids() {
        let mut order = sample();
        let removed = order.remove_subtree("a");
        assert_eq!(removed, vec!["a", "a1", "a1x", "a2"]);
        assert_eq!(order.roots, vec!["b"]);
        assert!(order.children.is_empty());
    }

    #[test]
    fn test_descendants_terminate_on_cycles() {
        let mut order = OrderIndex::new();
        order.children.insert("x".into(), vec!["y".into()]);
        order.children.insert("y".into(), vec!["x".into()]);
        assert_eq!(order.descendants("x"), vec!["y"]);
    }

    #[test]
    fn test_rename_moves_child_list() {
        let mut order = sample();
        order.rename("a1", "renamed");
        assert_eq!(order.children_of("a"), ["renamed", "a2"]);
        assert_eq!(order.children_of("renamed"), ["a1x"]);
    }
}
