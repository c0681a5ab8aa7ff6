//! Leaf annotation: scalar values wrapped with where they came from.

use chartmerge_yaml::{Document, MAX_DEPTH, NodeId, NodeKind, ScalarStyle, Slot, StructuralPath, Value};
use indexmap::IndexMap;

/// A source value together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedLeaf {
    pub value: Value,
    pub path: StructuralPath,
    /// Identifier of the document the value was read from.
    pub origin: String,
    /// 1-based source line, when the value was read from text.
    pub line: Option<usize>,
    /// How a string value was quoted; `None` for other values.
    pub quote_style: Option<ScalarStyle>,
    /// The value is written where its anchor is defined.
    pub is_anchor_definition: bool,
    pub anchor_name: Option<String>,
    /// The value was reached through an alias or a merge key.
    pub aliased: bool,
}

/// A desired-state tree.
///
/// Mappings are recursed into. Sequences are not: each item is captured as
/// a single leaf, because items are matched by position only.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatedNode {
    Mapping(IndexMap<String, AnnotatedNode>),
    Sequence(Vec<AnnotatedNode>),
    Leaf(AnnotatedLeaf),
}

impl AnnotatedNode {
    pub fn empty() -> Self {
        AnnotatedNode::Mapping(IndexMap::new())
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, AnnotatedNode>> {
        match self {
            AnnotatedNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&AnnotatedLeaf> {
        match self {
            AnnotatedNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&AnnotatedNode> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// The plain value this tree describes, annotations dropped.
    pub fn to_value(&self) -> Value {
        match self {
            AnnotatedNode::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(key, node)| (key.clone(), node.to_value()))
                    .collect(),
            ),
            AnnotatedNode::Sequence(items) => {
                Value::Sequence(items.iter().map(AnnotatedNode::to_value).collect())
            }
            AnnotatedNode::Leaf(leaf) => leaf.value.clone(),
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            AnnotatedNode::Mapping(map) => map.values().map(AnnotatedNode::leaf_count).sum(),
            AnnotatedNode::Sequence(items) => items.iter().map(AnnotatedNode::leaf_count).sum(),
            AnnotatedNode::Leaf(_) => 1,
        }
    }
}

/// Annotate a loaded document.
///
/// Merge keys are flattened, so the result never contains `<<`. A document
/// without content gives an empty mapping.
pub fn annotate(doc: &Document, origin: &str) -> AnnotatedNode {
    let Some(root) = doc.root() else {
        return AnnotatedNode::empty();
    };
    let annotator = Annotator { doc, origin };
    annotator.node(root, false, &StructuralPath::root(), 0)
}

struct Annotator<'a> {
    doc: &'a Document,
    origin: &'a str,
}

impl Annotator<'_> {
    fn node(&self, id: NodeId, aliased: bool, path: &StructuralPath, depth: usize) -> AnnotatedNode {
        if depth > MAX_DEPTH {
            tracing::warn!(origin = self.origin, %path, "nesting too deep, value dropped");
            return AnnotatedNode::empty();
        }
        match self.doc.node(id).kind() {
            NodeKind::Mapping(_) => {
                let entries = self.doc.merged_entries(id);
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, at) in entries {
                    let slot = &self.doc.entry(at).slot;
                    let child_aliased = aliased || at.inherited || slot.alias.is_some();
                    let child = self.node(slot.node, child_aliased, &path.key(key.as_str()), depth + 1);
                    map.insert(key, child);
                }
                AnnotatedNode::Mapping(map)
            }
            NodeKind::Sequence(items) => AnnotatedNode::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, slot)| AnnotatedNode::Leaf(self.item(slot, aliased, path.index(index))))
                    .collect(),
            ),
            NodeKind::Scalar(_) => AnnotatedNode::Leaf(self.scalar(id, aliased, path.clone())),
        }
    }

    fn scalar(&self, id: NodeId, aliased: bool, path: StructuralPath) -> AnnotatedLeaf {
        let node = self.doc.node(id);
        let value = self.doc.value_of(id);
        let quote_style = match (&value, node.as_scalar()) {
            (Value::String(_), Some(scalar)) => Some(scalar.style),
            _ => None,
        };
        AnnotatedLeaf {
            value,
            path,
            origin: self.origin.to_string(),
            line: node.source_info().map(|info| info.line),
            quote_style,
            is_anchor_definition: node.anchor().is_some() && !aliased,
            anchor_name: node.anchor().map(str::to_string),
            aliased,
        }
    }

    /// A sequence item, captured whole whatever its kind.
    fn item(&self, slot: &Slot, aliased: bool, path: StructuralPath) -> AnnotatedLeaf {
        let node = self.doc.node(slot.node);
        let value = self.doc.value_of(slot.node);
        let quote_style = match (&value, node.as_scalar()) {
            (Value::String(_), Some(scalar)) => Some(scalar.style),
            _ => None,
        };
        AnnotatedLeaf {
            value,
            path,
            origin: self.origin.to_string(),
            line: node.source_info().map(|info| info.line),
            quote_style,
            is_anchor_definition: false,
            anchor_name: None,
            aliased: aliased || slot.alias.is_some(),
        }
    }
}
