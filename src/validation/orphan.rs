//! Referential integrity of the order index, item store and contained resources.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{IssueKind, ValidationIssue};
use crate::types::{ContainedResource, Item, Items, OrderIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current traversal path, at this depth.
    OnPath(usize),
    Done,
}

/// Report orphaned items, dangling references, cycles and items contained
/// by more than one parent.
///
/// Runs in time linear in the size of the tree and terminates on any input,
/// including order indexes whose parent map contains cycles.
pub fn validate_orphaned_items(
    order: &OrderIndex,
    items: &Items,
    contained: &[ContainedResource],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    check_containment(order, items, &mut issues);

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut visited: Vec<&str> = Vec::new();
    let roots: Vec<&str> = order.roots.iter().map(String::as_str).collect();
    traverse(order, roots, &mut marks, &mut visited, &mut issues);
    let reachable: HashSet<&str> = visited.iter().copied().collect();

    // Parts of the index hanging off no root can still loop.
    let mut detached: Vec<&str> = order
        .children
        .keys()
        .map(String::as_str)
        .filter(|id| !marks.contains_key(id))
        .collect();
    detached.sort_unstable();
    let mut unreachable_visits = Vec::new();
    traverse(order, detached, &mut marks, &mut unreachable_visits, &mut issues);

    let mut orphans: Vec<&str> = items
        .keys()
        .map(String::as_str)
        .filter(|id| !reachable.contains(id))
        .collect();
    orphans.sort_unstable();
    for link_id in &orphans {
        issues.push(
            ValidationIssue::error(
                IssueKind::OrphanedItem,
                format!("Item '{link_id}' is not reachable from the questionnaire root"),
            )
            .with_link_id(*link_id),
        );
    }

    let contained_ids: HashSet<&str> = contained.iter().map(|r| r.id.as_str()).collect();
    let in_document_order = visited.iter().chain(orphans.iter());
    for link_id in in_document_order {
        if let Some(item) = items.get(*link_id) {
            check_references(item, items, &contained_ids, &mut issues);
        }
    }

    issues
}

/// Every identifier may be listed once, and only if it exists.
fn check_containment(order: &OrderIndex, items: &Items, issues: &mut Vec<ValidationIssue>) {
    let mut holders: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for id in &order.roots {
        holders.entry(id.as_str()).or_default().push("(root)");
    }
    for (parent, children) in &order.children {
        for id in children {
            holders.entry(id.as_str()).or_default().push(parent.as_str());
        }
    }

    for (link_id, parents) in &holders {
        if parents.len() > 1 {
            let mut parents = parents.clone();
            parents.sort_unstable();
            issues.push(
                ValidationIssue::error(
                    IssueKind::DuplicateContainment,
                    format!(
                        "Item '{link_id}' is listed {} times (under {})",
                        parents.len(),
                        parents.join(", ")
                    ),
                )
                .with_link_id(*link_id),
            );
        }
    }

    let listed: BTreeSet<&str> = holders
        .keys()
        .copied()
        .chain(order.children.keys().map(String::as_str))
        .collect();
    for link_id in listed.into_iter().filter(|id| !items.contains_key(*id)) {
        issues.push(
            ValidationIssue::error(
                IssueKind::DanglingReference,
                format!("Order index refers to unknown item '{link_id}'"),
            )
            .with_link_id(link_id),
        );
    }
}

/// Depth-first walk with an explicit stack. Identifiers are expanded once;
/// an edge back onto the current path is reported as a cycle.
fn traverse<'a>(
    order: &'a OrderIndex,
    starts: Vec<&'a str>,
    marks: &mut HashMap<&'a str, Mark>,
    visited: &mut Vec<&'a str>,
    issues: &mut Vec<ValidationIssue>,
) {
    for start in starts {
        if marks.contains_key(start) {
            continue;
        }
        marks.insert(start, Mark::OnPath(0));
        visited.push(start);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

        while let Some(&(node, next)) = stack.last() {
            let children = order.children_of(node);
            if next >= children.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let child = children[next].as_str();
            match marks.get(child).copied() {
                Some(Mark::OnPath(depth)) => {
                    let cycle: Vec<String> =
                        stack[depth..].iter().map(|(id, _)| id.to_string()).collect();
                    issues.push(
                        ValidationIssue::error(
                            IssueKind::CycleDetected,
                            format!(
                                "Items form a containment cycle: {} -> {child}",
                                cycle.join(" -> ")
                            ),
                        )
                        .with_link_ids(cycle),
                    );
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child, Mark::OnPath(stack.len()));
                    visited.push(child);
                    stack.push((child, 0));
                }
            }
        }
    }
}

fn check_references(
    item: &Item,
    items: &Items,
    contained_ids: &HashSet<&str>,
    issues: &mut Vec<ValidationIssue>,
) {
    for condition in &item.enable_when {
        let Some(target) = items.get(&condition.question) else {
            issues.push(
                ValidationIssue::error(
                    IssueKind::DanglingReference,
                    format!(
                        "enableWhen on '{}' refers to missing item '{}'",
                        item.link_id, condition.question
                    ),
                )
                .with_link_id(item.link_id.clone())
                .with_link_id(condition.question.clone()),
            );
            continue;
        };

        let answer_code = condition
            .answer_coding
            .as_ref()
            .and_then(|coding| coding.code.as_deref());
        if let Some(code) = answer_code {
            if !target.answer_option.is_empty() && !target.has_option_code(code) {
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::DanglingReference,
                        format!(
                            "enableWhen on '{}' expects answer '{code}' which '{}' no longer offers",
                            item.link_id, target.link_id
                        ),
                    )
                    .with_link_id(item.link_id.clone())
                    .with_link_id(target.link_id.clone()),
                );
            }
        }
    }

    if let Some(value_set) = item.contained_value_set() {
        if !contained_ids.contains(value_set) {
            issues.push(
                ValidationIssue::error(
                    IssueKind::DanglingReference,
                    format!(
                        "Item '{}' refers to missing contained resource '{value_set}'",
                        item.link_id
                    ),
                )
                .with_link_id(item.link_id.clone()),
            );
        }
    }
}
