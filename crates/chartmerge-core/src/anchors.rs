//! Index of anchor definitions in a target document.

use chartmerge_yaml::{Document, MAX_DEPTH, NodeId, NodeKind};
use std::collections::HashMap;

/// Anchor names mapped to the nodes that define them.
///
/// Built fresh for every target document, since anchor names are local to a
/// file. When a name is defined twice the later definition wins.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    anchors: HashMap<String, NodeId>,
}

impl AnchorIndex {
    /// Index every anchor of `doc`, visiting nodes depth-first in document
    /// order. Alias uses are not descended into.
    pub fn build(doc: &Document) -> Self {
        let mut index = Self::default();
        if let Some(root) = doc.root() {
            index.visit(doc, root, 0);
        }
        tracing::debug!(anchors = index.anchors.len(), "indexed anchors");
        index
    }

    fn visit(&mut self, doc: &Document, id: NodeId, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        let node = doc.node(id);
        if let Some(name) = node.anchor().filter(|name| !name.is_empty()) {
            self.anchors.insert(name.to_string(), id);
        }
        match node.kind() {
            NodeKind::Mapping(entries) => {
                for entry in entries.iter().filter(|e| e.slot.alias.is_none()) {
                    self.visit(doc, entry.slot.node, depth + 1);
                }
            }
            NodeKind::Sequence(items) => {
                for slot in items.iter().filter(|s| s.alias.is_none()) {
                    self.visit(doc, slot.node, depth + 1);
                }
            }
            NodeKind::Scalar(_) => {}
        }
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.anchors.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.anchors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartmerge_yaml::parse;

    #[test]
    fn test_indexes_every_kind_of_node() {
        let doc = parse("a: &s 1\nb: &m {x: 1}\nc: &q [1]\nd:\n  e: &nested two\nf: *s\n").unwrap();
        let index = AnchorIndex::build(&doc);
        assert_eq!(index.len(), 4);
        for (name, path) in [("s", "a"), ("m", "b"), ("q", "c"), ("nested", "d.e")] {
            assert_eq!(index.get(name), doc.resolve(&path.parse().unwrap()));
        }
    }

    #[test]
    fn test_later_definition_wins() {
        let doc = parse("first: &dup 1\nsecond: &dup 2\n").unwrap();
        let index = AnchorIndex::build(&doc);
        assert_eq!(index.get("dup"), doc.resolve(&"second".parse().unwrap()));
    }

    #[test]
    fn test_no_anchors() {
        let doc = parse("a: 1\n").unwrap();
        assert!(AnchorIndex::build(&doc).is_empty());
        let empty = parse("").unwrap();
        assert!(AnchorIndex::build(&empty).is_empty());
    }
}
