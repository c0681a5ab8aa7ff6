//! The lock-step merge of a desired-state tree into a target document.

use crate::anchors::AnchorIndex;
use crate::annotate::{AnnotatedLeaf, AnnotatedNode};
use chartmerge_yaml::{Document, EntryRef, MAX_DEPTH, NodeId, NodeKind, SlotRef, StructuralPath, Value};
use serde::Serialize;

/// How a change reached the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Route {
    /// The node at the position defines an anchor and was changed in place.
    InPlace,
    /// The change was written to the definition of `anchor`.
    Redirected { anchor: String },
    /// The value at the position was replaced.
    Positional,
    /// A new item was added at the end of a sequence.
    Appended,
}

/// One change made to a target document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub path: StructuralPath,
    /// Value before the change; `None` for appended items.
    pub before: Option<Value>,
    pub after: Value,
    pub route: Route,
}

/// Changes made by one [`apply`] pass, in walk order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub changes: Vec<Change>,
}

impl MergeReport {
    /// Changed paths in walk order.
    pub fn paths(&self) -> Vec<StructuralPath> {
        self.changes.iter().map(|c| c.path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Apply `desired` to `target` in place.
///
/// The walk descends only where both sides have a matching position:
///
/// - mapping keys missing from the target are skipped, never added;
/// - sequence items are matched by index, and items past the end of the
///   target sequence are appended;
/// - positions whose kinds differ are left alone.
///
/// A leaf whose value differs from the target is written, in order of
/// preference, to the target node itself when it defines an anchor, to the
/// target's definition of the anchor the leaf was read from, to the anchored
/// mapping a merge key inherits it from, or else over the value at the
/// position.
pub fn apply(desired: &AnnotatedNode, target: &mut Document, anchors: &AnchorIndex) -> MergeReport {
    let Some(root) = target.root() else {
        tracing::debug!("target has no content");
        return MergeReport::default();
    };
    let mut walk = MergeWalk {
        target,
        anchors,
        report: MergeReport::default(),
    };
    walk.node(desired, root, &StructuralPath::root(), 0);
    walk.report
}

struct MergeWalk<'a> {
    target: &'a mut Document,
    anchors: &'a AnchorIndex,
    report: MergeReport,
}

impl MergeWalk<'_> {
    fn node(&mut self, desired: &AnnotatedNode, node: NodeId, path: &StructuralPath, depth: usize) {
        if depth > MAX_DEPTH {
            tracing::warn!(%path, "nesting too deep, not merged");
            return;
        }
        match (desired, self.target.node(node).kind()) {
            (AnnotatedNode::Mapping(map), NodeKind::Mapping(_)) => {
                for (key, child) in map {
                    let child_path = path.key(key.as_str());
                    let Some(entry) = self.target.lookup(node, key) else {
                        tracing::debug!(path = %child_path, "not in target, skipped");
                        continue;
                    };
                    match child {
                        AnnotatedNode::Leaf(leaf) => self.entry_leaf(leaf, entry, &child_path),
                        nested => {
                            let target_child = self.target.entry(entry).slot.node;
                            self.node(nested, target_child, &child_path, depth + 1);
                        }
                    }
                }
            }
            (AnnotatedNode::Sequence(items), NodeKind::Sequence(_)) => {
                for (index, item) in items.iter().enumerate() {
                    let child_path = path.index(index);
                    if index >= self.target.items(node).len() {
                        self.append(node, item, child_path);
                        continue;
                    }
                    let at = SlotRef::Item { owner: node, index };
                    match item {
                        AnnotatedNode::Leaf(leaf) => self.leaf(leaf, at, None, &child_path),
                        nested => {
                            let target_child = self.target.items(node)[index].node;
                            self.node(nested, target_child, &child_path, depth + 1);
                        }
                    }
                }
            }
            (desired, kind) => {
                tracing::debug!(
                    %path,
                    desired = desired_kind(desired),
                    target = target_kind(kind),
                    "kinds differ, left unchanged"
                );
            }
        }
    }

    /// A leaf held by a mapping entry. Scalars never overwrite collections.
    fn entry_leaf(&mut self, leaf: &AnnotatedLeaf, entry: EntryRef, path: &StructuralPath) {
        let node = self.target.entry(entry).slot.node;
        let target = self.target.node(node);
        if leaf.value.is_scalar() && !matches!(target.kind(), NodeKind::Scalar(_)) {
            tracing::debug!(
                %path,
                target = target_kind(target.kind()),
                "scalar over collection, left unchanged"
            );
            return;
        }
        self.leaf(leaf, entry.slot_ref(), Some(entry), path);
    }

    fn leaf(&mut self, leaf: &AnnotatedLeaf, at: SlotRef, entry: Option<EntryRef>, path: &StructuralPath) {
        let Some(slot) = self.target.slot(at).cloned() else {
            return;
        };
        let current = self.target.value_of(slot.node);
        if current == leaf.value {
            tracing::debug!(%path, "unchanged");
            return;
        }

        let anchor = self.target.node(slot.node).anchor().map(str::to_string);
        let route = match (anchor, &slot.alias) {
            (Some(_), None) => {
                self.target.assign(slot.node, leaf.value.clone());
                Route::InPlace
            }
            _ => match self.redirect(leaf) {
                Some(Redirect::Done(route)) => route,
                Some(Redirect::AlreadySet) => return,
                None => self.positional(leaf, at, entry),
            },
        };

        tracing::info!(%path, before = %current, after = %leaf.value, ?route, "updated");
        self.report.changes.push(Change {
            path: path.clone(),
            before: Some(current),
            after: leaf.value.clone(),
            route,
        });
    }

    /// Write to the target's definition of the anchor the leaf came from.
    fn redirect(&mut self, leaf: &AnnotatedLeaf) -> Option<Redirect> {
        let name = leaf.anchor_name.as_deref()?;
        let definition = self.anchors.get(name)?;
        if self.target.value_of(definition) == leaf.value {
            tracing::debug!(anchor = name, path = %leaf.path, "anchor already holds the value");
            return Some(Redirect::AlreadySet);
        }
        self.target.assign(definition, leaf.value.clone());
        tracing::debug!(anchor = name, "updated anchor definition");
        Some(Redirect::Done(Route::Redirected {
            anchor: name.to_string(),
        }))
    }

    fn positional(&mut self, leaf: &AnnotatedLeaf, at: SlotRef, entry: Option<EntryRef>) -> Route {
        self.target.replace(at, leaf.value.clone());
        match entry.filter(|e| e.inherited) {
            // The entry lives in a mapping pulled in by a merge key.
            Some(entry) => Route::Redirected {
                anchor: self
                    .target
                    .node(entry.owner)
                    .anchor()
                    .unwrap_or_default()
                    .to_string(),
            },
            None => Route::Positional,
        }
    }

    fn append(&mut self, sequence: NodeId, item: &AnnotatedNode, path: StructuralPath) {
        let value = item.to_value();
        self.target.push(sequence, value.clone());
        tracing::info!(%path, value = %value, "appended");
        self.report.changes.push(Change {
            path,
            before: None,
            after: value,
            route: Route::Appended,
        });
    }
}

enum Redirect {
    Done(Route),
    AlreadySet,
}

fn desired_kind(node: &AnnotatedNode) -> &'static str {
    match node {
        AnnotatedNode::Mapping(_) => "mapping",
        AnnotatedNode::Sequence(_) => "sequence",
        AnnotatedNode::Leaf(leaf) => leaf.value.kind_name(),
    }
}

fn target_kind(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Mapping(_) => "mapping",
        NodeKind::Sequence(_) => "sequence",
        NodeKind::Scalar(scalar) => scalar.value.kind_name(),
    }
}
