//! Field-level comparison of two content snapshots.
//!
//! Metadata is compared key by key. Elements are matched by id across the
//! flattened tree; an element's own `type`/`data` decide whether it changed,
//! its children are compared as elements of their own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::content::{Element, Snapshot};
use crate::types::{DbId, VersionNumber};

/// The status of an item in a diff comparison.
///
/// - `Added`     -- present only in the newer side.
/// - `Removed`   -- present only in the older side.
/// - `Changed`   -- present in both sides but with different values.
/// - `Moved`     -- same value, different parent or sibling order.
/// - `Unchanged` -- present in both sides with identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Moved,
    Unchanged,
}

impl DiffStatus {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Moved => "moved",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

/// A single metadata key compared across two versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataChange {
    pub key: String,
    pub from: Option<serde_json::Value>,
    pub to: Option<serde_json::Value>,
    pub status: DiffStatus,
}

/// A single element that differs between two versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementChange {
    pub element_id: String,
    pub kind: String,
    pub status: DiffStatus,
    pub from_parent: Option<String>,
    pub to_parent: Option<String>,
    /// Index among its siblings in the older version.
    pub from_position: Option<usize>,
    /// Index among its siblings in the newer version.
    pub to_position: Option<usize>,
    /// Shift in order relative to the siblings both versions share. Only set
    /// for elements present in both versions.
    pub delta: Option<i64>,
}

/// Title comparison. Only present when the title differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleChange {
    pub from: String,
    pub to: String,
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub title: Option<TitleChange>,
    /// Every metadata key from either side, sorted by key.
    pub metadata: Vec<MetadataChange>,
    /// Only elements that differ: changed/added/moved in newer tree order,
    /// then removed in older tree order.
    pub elements: Vec<ElementChange>,
}

impl SnapshotDiff {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || !self.elements.is_empty()
            || self
                .metadata
                .iter()
                .any(|m| m.status != DiffStatus::Unchanged)
    }
}

/// Comparison of two stored versions of a content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDiff {
    pub content_id: DbId,
    pub from_version: VersionNumber,
    pub to_version: VersionNumber,
    #[serde(flatten)]
    pub diff: SnapshotDiff,
}

// ---------------------------------------------------------------------------
// Comparison logic
// ---------------------------------------------------------------------------

/// Compare two snapshots field by field.
pub fn compare_snapshots(from: &Snapshot, to: &Snapshot) -> SnapshotDiff {
    let title = (from.title != to.title).then(|| TitleChange {
        from: from.title.clone(),
        to: to.title.clone(),
    });

    SnapshotDiff {
        title,
        metadata: compare_metadata(&from.metadata, &to.metadata),
        elements: compare_elements(&from.elements, &to.elements),
    }
}

/// Compare two metadata objects key by key.
///
/// Non-object inputs are treated as empty objects. Returns every key from
/// either side, sorted by key name.
pub fn compare_metadata(from: &serde_json::Value, to: &serde_json::Value) -> Vec<MetadataChange> {
    let empty = serde_json::Map::new();
    let from_obj = from.as_object().unwrap_or(&empty);
    let to_obj = to.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = from_obj.keys().chain(to_obj.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .map(|key| {
            let old = from_obj.get(key);
            let new = to_obj.get(key);
            let status = match (old, new) {
                (Some(_), None) => DiffStatus::Removed,
                (None, Some(_)) => DiffStatus::Added,
                (Some(a), Some(b)) if a != b => DiffStatus::Changed,
                _ => DiffStatus::Unchanged,
            };
            MetadataChange {
                key: key.clone(),
                from: old.cloned(),
                to: new.cloned(),
                status,
            }
        })
        .collect()
}

/// An element placed in its tree: parent and sibling index.
struct Placed<'a> {
    element: &'a Element,
    parent: Option<&'a str>,
    position: usize,
}

fn flatten<'a>(elements: &'a [Element], parent: Option<&'a str>, out: &mut Vec<Placed<'a>>) {
    for (position, element) in elements.iter().enumerate() {
        out.push(Placed {
            element,
            parent,
            position,
        });
        flatten(&element.children, Some(element.id.as_str()), out);
    }
}

/// Index of every shared element among its shared siblings, so that inserts
/// and removals around an element do not register as moves.
fn relative_order<'a>(
    placed: &[Placed<'a>],
    shared: &dyn Fn(&str) -> bool,
) -> HashMap<&'a str, usize> {
    let mut next_index: HashMap<Option<&str>, usize> = HashMap::new();
    let mut order = HashMap::new();
    // Depth-first order visits siblings in sibling order.
    for p in placed {
        if !shared(p.element.id.as_str()) {
            continue;
        }
        let slot = next_index.entry(p.parent).or_insert(0);
        order.insert(p.element.id.as_str(), *slot);
        *slot += 1;
    }
    order
}

/// Compare two element trees, matching elements by id.
pub fn compare_elements(from: &[Element], to: &[Element]) -> Vec<ElementChange> {
    let mut old = Vec::new();
    flatten(from, None, &mut old);
    let mut new = Vec::new();
    flatten(to, None, &mut new);

    let old_by_id: HashMap<&str, &Placed> =
        old.iter().map(|p| (p.element.id.as_str(), p)).collect();
    let new_by_id: HashMap<&str, &Placed> =
        new.iter().map(|p| (p.element.id.as_str(), p)).collect();

    let shared = |id: &str| old_by_id.contains_key(id) && new_by_id.contains_key(id);
    let old_order = relative_order(&old, &shared);
    let new_order = relative_order(&new, &shared);

    let mut changes = Vec::new();

    for n in &new {
        let id = n.element.id.as_str();
        let Some(o) = old_by_id.get(id) else {
            changes.push(ElementChange {
                element_id: id.to_string(),
                kind: n.element.kind.clone(),
                status: DiffStatus::Added,
                from_parent: None,
                to_parent: n.parent.map(str::to_string),
                from_position: None,
                to_position: Some(n.position),
                delta: None,
            });
            continue;
        };

        let content_changed = o.element.kind != n.element.kind || o.element.data != n.element.data;
        let from_rel = old_order.get(id).copied().unwrap_or(o.position) as i64;
        let to_rel = new_order.get(id).copied().unwrap_or(n.position) as i64;
        let moved = o.parent != n.parent || from_rel != to_rel;

        let status = if content_changed {
            DiffStatus::Changed
        } else if moved {
            DiffStatus::Moved
        } else {
            continue;
        };

        changes.push(ElementChange {
            element_id: id.to_string(),
            kind: n.element.kind.clone(),
            status,
            from_parent: o.parent.map(str::to_string),
            to_parent: n.parent.map(str::to_string),
            from_position: Some(o.position),
            to_position: Some(n.position),
            delta: Some(to_rel - from_rel),
        });
    }

    for o in &old {
        if !new_by_id.contains_key(o.element.id.as_str()) {
            changes.push(ElementChange {
                element_id: o.element.id.clone(),
                kind: o.element.kind.clone(),
                status: DiffStatus::Removed,
                from_parent: o.parent.map(str::to_string),
                to_parent: None,
                from_position: Some(o.position),
                to_position: None,
                delta: None,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn el(id: &str, text: &str) -> Element {
        Element::new(id, "paragraph", json!({ "text": text }))
    }

    fn snapshot(title: &str, metadata: serde_json::Value, elements: Vec<Element>) -> Snapshot {
        Snapshot {
            title: title.to_string(),
            metadata,
            elements,
        }
    }

    fn find<'a>(changes: &'a [ElementChange], id: &str) -> &'a ElementChange {
        changes
            .iter()
            .find(|c| c.element_id == id)
            .unwrap_or_else(|| panic!("no change for {id}"))
    }

    #[test]
    fn as_str_returns_correct_strings() {
        assert_eq!(DiffStatus::Added.as_str(), "added");
        assert_eq!(DiffStatus::Removed.as_str(), "removed");
        assert_eq!(DiffStatus::Changed.as_str(), "changed");
        assert_eq!(DiffStatus::Moved.as_str(), "moved");
        assert_eq!(DiffStatus::Unchanged.as_str(), "unchanged");
    }

    #[test]
    fn metadata_compared_key_by_key() {
        let diff = compare_metadata(
            &json!({"a": 1, "b": 2, "c": 3}),
            &json!({"a": 1, "b": 5, "d": 4}),
        );
        let statuses: Vec<(&str, DiffStatus)> =
            diff.iter().map(|m| (m.key.as_str(), m.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("a", DiffStatus::Unchanged),
                ("b", DiffStatus::Changed),
                ("c", DiffStatus::Removed),
                ("d", DiffStatus::Added),
            ]
        );
    }

    #[test]
    fn non_object_metadata_treated_as_empty() {
        let diff = compare_metadata(&json!(null), &json!({"k": true}));
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].status, DiffStatus::Added);
    }

    #[test]
    fn identical_trees_produce_no_element_changes() {
        let tree = vec![el("a", "1"), el("b", "2")];
        assert!(compare_elements(&tree, &tree).is_empty());
    }

    #[test]
    fn added_removed_and_changed_elements() {
        let from = vec![el("a", "1"), el("b", "2")];
        let to = vec![el("a", "1 edited"), el("c", "3")];
        let changes = compare_elements(&from, &to);

        assert_eq!(find(&changes, "a").status, DiffStatus::Changed);
        assert_eq!(find(&changes, "c").status, DiffStatus::Added);
        assert_eq!(find(&changes, "c").to_position, Some(1));
        assert_eq!(find(&changes, "b").status, DiffStatus::Removed);
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn insertion_before_sibling_is_not_a_move() {
        let from = vec![el("a", "1"), el("b", "2")];
        let to = vec![el("new", "0"), el("a", "1"), el("b", "2")];
        let changes = compare_elements(&from, &to);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, DiffStatus::Added);
    }

    #[test]
    fn reordered_siblings_are_reported_as_moved_with_deltas() {
        let from = vec![el("a", "1"), el("b", "2"), el("c", "3")];
        let to = vec![el("c", "3"), el("a", "1"), el("b", "2")];
        let changes = compare_elements(&from, &to);

        let c = find(&changes, "c");
        assert_eq!(c.status, DiffStatus::Moved);
        assert_eq!(c.delta, Some(-2));
        assert_eq!(find(&changes, "a").delta, Some(1));
        assert_eq!(find(&changes, "b").delta, Some(1));
    }

    #[test]
    fn reparented_element_is_moved() {
        let from = vec![
            Element::new("s1", "section", json!({})).with_children(vec![el("p", "x")]),
            Element::new("s2", "section", json!({})),
        ];
        let to = vec![
            Element::new("s1", "section", json!({})),
            Element::new("s2", "section", json!({})).with_children(vec![el("p", "x")]),
        ];
        let changes = compare_elements(&from, &to);
        assert_eq!(changes.len(), 1);
        let p = find(&changes, "p");
        assert_eq!(p.status, DiffStatus::Moved);
        assert_eq!(p.from_parent.as_deref(), Some("s1"));
        assert_eq!(p.to_parent.as_deref(), Some("s2"));
    }

    #[test]
    fn child_edit_does_not_mark_parent_changed() {
        let from = vec![Element::new("s", "section", json!({})).with_children(vec![el("p", "x")])];
        let to = vec![Element::new("s", "section", json!({})).with_children(vec![el("p", "y")])];
        let changes = compare_elements(&from, &to);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].element_id, "p");
    }

    #[test]
    fn snapshot_diff_reports_title_change() {
        let a = snapshot("Old", json!({}), vec![]);
        let b = snapshot("New", json!({}), vec![]);
        let diff = compare_snapshots(&a, &b);
        assert_eq!(
            diff.title,
            Some(TitleChange {
                from: "Old".into(),
                to: "New".into()
            })
        );
        assert!(diff.has_changes());
        assert!(!compare_snapshots(&a, &a).has_changes());
    }
}
