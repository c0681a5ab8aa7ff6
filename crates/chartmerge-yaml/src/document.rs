//! Arena-backed YAML documents with format-preserving edits.
//!
//! Every node lives in one arena and is addressed by a [`NodeId`]. An alias
//! is not a copy: the slot holding it points at the same `NodeId` as the
//! anchor, so a change made through either view is seen by both.
//!
//! Mutations never rewrite the whole document. Each one records the byte
//! range of the original text it overwrites, and [`Document::to_text`]
//! splices freshly rendered text into an otherwise untouched copy of the
//! source.

use crate::emit;
use crate::path::{PathSegment, StructuralPath};
use crate::scan;
use crate::source_info::SourceInfo;
use crate::value::{ScalarStyle, Value};
use indexmap::IndexMap;

/// Nesting limit for recursive reads and walks.
pub const MAX_DEPTH: usize = 256;

/// Handle of a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) anchor: Option<String>,
    pub(crate) tag: Option<String>,
    /// Span of the node content in the source; `None` for nodes created by
    /// a mutation.
    pub(crate) source_info: Option<SourceInfo>,
    pub(crate) layout: Layout,
}

impl Node {
    pub(crate) fn synthetic(kind: NodeKind) -> Self {
        Self {
            kind,
            anchor: None,
            tag: None,
            source_info: None,
            layout: Layout::default(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Anchor name this node defines (`&name`).
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Tag suffix (`str` for `!!str`).
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.source_info.as_ref()
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }
}

/// Textual layout of a source node.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Layout {
    /// Written in flow style (`[..]` / `{..}`).
    pub(crate) flow: bool,
    /// Column of the items of a block collection, or the content
    /// indentation of a block scalar.
    pub(crate) indent: usize,
    /// An implicit null with no text; its span is an insertion point.
    pub(crate) empty: bool,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Mapping(Vec<Entry>),
    Sequence(Vec<Slot>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub value: Value,
    pub style: ScalarStyle,
}

/// One `key: value` pair of a mapping.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: String,
    /// A `<<` merge key; its value names the mappings merged in.
    pub merge: bool,
    pub slot: Slot,
}

/// A position holding a node: a mapping value, a sequence item or the root.
#[derive(Debug, Clone)]
pub struct Slot {
    pub node: NodeId,
    /// Set when the position holds an alias rather than its own node.
    pub alias: Option<AliasUse>,
}

/// Where an alias (`*name`) is written.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasUse {
    pub name: String,
    pub source_info: SourceInfo,
}

/// Result of a mapping lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    /// Mapping that actually holds the entry.
    pub owner: NodeId,
    pub index: usize,
    /// Found through a merge key rather than on the mapping itself.
    pub inherited: bool,
}

impl EntryRef {
    pub fn slot_ref(&self) -> SlotRef {
        SlotRef::Entry {
            owner: self.owner,
            index: self.index,
        }
    }
}

/// Address of a slot, used for positional replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    Root,
    Entry { owner: NodeId, index: usize },
    Item { owner: NodeId, index: usize },
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    node: NodeId,
    kind: EditKind,
    /// Rendered line breaks are written as `\r\n`.
    crlf: bool,
}

#[derive(Debug, Clone, Copy)]
enum EditKind {
    /// Node content rendered over `start..end`.
    Inline {
        style: ScalarStyle,
        indent: usize,
        lead: bool,
    },
    /// New sequence item inserted at `start`.
    Item {
        indent: usize,
        flow: bool,
        prefix: &'static str,
    },
}

impl Edit {
    fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Whether `self` overwrites text that contains all of `other`.
    fn covers(&self, other: &Edit) -> bool {
        if self.is_insertion() || !matches!(self.kind, EditKind::Inline { .. }) {
            return false;
        }
        let inside = self.start <= other.start && other.end <= self.end;
        let on_boundary =
            other.is_insertion() && (other.start == self.start || other.start == self.end);
        inside && !on_boundary
    }
}

/// A loaded YAML document.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    file: Option<String>,
    nodes: Vec<Node>,
    root: Option<Slot>,
    edits: Vec<Edit>,
    modified: bool,
}

impl Document {
    pub(crate) fn from_parts(
        source: String,
        file: Option<String>,
        nodes: Vec<Node>,
        root: Option<Slot>,
    ) -> Self {
        Self {
            source,
            file,
            nodes,
            root,
            edits: Vec::new(),
            modified: false,
        }
    }

    /// The text the document was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Root node, or `None` for a stream with no document.
    pub fn root(&self) -> Option<NodeId> {
        self.root.as_ref().map(|slot| slot.node)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes in the arena, including those created by mutations.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Entries of a mapping as written, merge keys included.
    pub fn entries(&self, id: NodeId) -> &[Entry] {
        match &self.node(id).kind {
            NodeKind::Mapping(entries) => entries,
            _ => &[],
        }
    }

    /// Items of a sequence.
    pub fn items(&self, id: NodeId) -> &[Slot] {
        match &self.node(id).kind {
            NodeKind::Sequence(items) => items,
            _ => &[],
        }
    }

    pub fn entry(&self, entry: EntryRef) -> &Entry {
        &self.entries(entry.owner)[entry.index]
    }

    pub fn slot(&self, at: SlotRef) -> Option<&Slot> {
        match at {
            SlotRef::Root => self.root.as_ref(),
            SlotRef::Entry { owner, index } => self.entries(owner).get(index).map(|e| &e.slot),
            SlotRef::Item { owner, index } => self.items(owner).get(index),
        }
    }

    fn slot_mut(&mut self, at: SlotRef) -> Option<&mut Slot> {
        match at {
            SlotRef::Root => self.root.as_mut(),
            SlotRef::Entry { owner, index } => match &mut self.nodes[owner.0].kind {
                NodeKind::Mapping(entries) => entries.get_mut(index).map(|e| &mut e.slot),
                _ => None,
            },
            SlotRef::Item { owner, index } => match &mut self.nodes[owner.0].kind {
                NodeKind::Sequence(items) => items.get_mut(index),
                _ => None,
            },
        }
    }

    /// Find `key` in a mapping.
    ///
    /// Keys the mapping holds itself win; otherwise the mappings named by its
    /// merge keys are searched in order.
    pub fn lookup(&self, map: NodeId, key: &str) -> Option<EntryRef> {
        self.lookup_at(map, key, 0)
    }

    fn lookup_at(&self, map: NodeId, key: &str, depth: usize) -> Option<EntryRef> {
        if depth > MAX_DEPTH {
            return None;
        }
        let entries = match &self.node(map).kind {
            NodeKind::Mapping(entries) => entries,
            _ => return None,
        };
        if let Some(index) = entries.iter().rposition(|e| !e.merge && e.key == key) {
            return Some(EntryRef {
                owner: map,
                index,
                inherited: depth > 0,
            });
        }
        self.merge_sources(map)
            .into_iter()
            .find_map(|source| self.lookup_at(source, key, depth + 1))
    }

    /// Mappings merged into `map` through `<<` keys, in priority order.
    pub fn merge_sources(&self, map: NodeId) -> Vec<NodeId> {
        let mut sources = Vec::new();
        for entry in self.entries(map).iter().filter(|e| e.merge) {
            let target = entry.slot.node;
            match &self.node(target).kind {
                NodeKind::Mapping(_) => sources.push(target),
                NodeKind::Sequence(items) => sources.extend(
                    items
                        .iter()
                        .map(|slot| slot.node)
                        .filter(|&id| self.node(id).is_mapping()),
                ),
                NodeKind::Scalar(_) => {}
            }
        }
        sources
    }

    /// Every key visible on a mapping, merge keys expanded: own keys first
    /// in document order, then inherited keys not shadowed.
    pub fn merged_entries(&self, map: NodeId) -> IndexMap<String, EntryRef> {
        let mut out = IndexMap::new();
        self.collect_entries(map, 0, &mut out);
        out
    }

    fn collect_entries(&self, map: NodeId, depth: usize, out: &mut IndexMap<String, EntryRef>) {
        if depth > MAX_DEPTH {
            return;
        }
        let mut inherited = Vec::new();
        for (index, entry) in self.entries(map).iter().enumerate() {
            if entry.merge {
                continue;
            }
            let found = EntryRef {
                owner: map,
                index,
                inherited: depth > 0,
            };
            if depth == 0 {
                out.insert(entry.key.clone(), found);
            } else if !out.contains_key(&entry.key) {
                inherited.push((entry.key.clone(), found));
            }
        }
        out.extend(inherited);
        for source in self.merge_sources(map) {
            self.collect_entries(source, depth + 1, out);
        }
    }

    /// Node at a structural path from the root.
    pub fn resolve(&self, path: &StructuralPath) -> Option<NodeId> {
        let mut current = self.root()?;
        for segment in path.segments() {
            current = match segment {
                PathSegment::Key(key) => self.entry(self.lookup(current, key)?).slot.node,
                PathSegment::Index(index) => self.items(current).get(*index)?.node,
            };
        }
        Some(current)
    }

    /// Plain value at a path written as `a.b[2].c`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path: StructuralPath = path.parse().ok()?;
        self.resolve(&path).map(|id| self.value_of(id))
    }

    /// Detached value of a node, with aliases and merge keys expanded.
    pub fn value_of(&self, id: NodeId) -> Value {
        self.value_at(id, 0)
    }

    fn value_at(&self, id: NodeId, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::Null;
        }
        match &self.node(id).kind {
            NodeKind::Scalar(scalar) => scalar.value.clone(),
            NodeKind::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .map(|slot| self.value_at(slot.node, depth + 1))
                    .collect(),
            ),
            NodeKind::Mapping(_) => {
                let mut entries = IndexMap::new();
                self.collect_entries(id, 0, &mut entries);
                Value::Mapping(
                    entries
                        .into_iter()
                        .map(|(key, at)| (key, self.value_at(self.entry(at).slot.node, depth + 1)))
                        .collect(),
                )
            }
        }
    }

    /// Whether any mutation has been applied.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Change a node's content in place.
    ///
    /// The node keeps its identity, anchor and tag, so every alias of it
    /// observes the new value.
    pub fn assign(&mut self, id: NodeId, value: Value) {
        let kind = self.kind_from_value(&value, self.scalar_style(id));
        self.nodes[id.0].kind = kind;
        self.modified = true;
        if let Some(edit) = self.inline_edit(id, id) {
            self.add_edit(edit);
        }
    }

    /// Put a new plain value at a position.
    ///
    /// An alias at the position is detached: its `*name` token is overwritten
    /// and the anchored node is left alone. A position owning an anchored
    /// node is assigned instead, keeping the anchor. Returns the node now at
    /// the position.
    pub fn replace(&mut self, at: SlotRef, value: Value) -> Option<NodeId> {
        let slot = self.slot(at)?.clone();
        let old = slot.node;
        if slot.alias.is_none() && self.node(old).anchor.is_some() {
            self.assign(old, value);
            return Some(old);
        }

        let style = match &slot.alias {
            Some(_) => ScalarStyle::Plain,
            None => self.scalar_style(old),
        };
        let kind = self.kind_from_value(&value, style);
        let tag = match &slot.alias {
            Some(_) => None,
            None => self.node(old).tag.clone(),
        };
        let new = self.alloc(Node {
            tag,
            ..Node::synthetic(kind)
        });

        let edit = match &slot.alias {
            Some(alias) => Some(Edit {
                start: alias.source_info.offset,
                end: alias.source_info.end_offset(),
                node: new,
                kind: EditKind::Inline {
                    style: ScalarStyle::Plain,
                    indent: 0,
                    lead: false,
                },
                crlf: scan::crlf_at(&self.source, alias.source_info.offset),
            }),
            None => self.inline_edit(old, new),
        };

        if let Some(target) = self.slot_mut(at) {
            target.node = new;
            target.alias = None;
        }
        self.modified = true;
        if let Some(edit) = edit {
            self.add_edit(edit);
        }
        Some(new)
    }

    /// Append an item to a sequence. Returns `None` if `seq` is not a
    /// sequence.
    pub fn push(&mut self, seq: NodeId, value: Value) -> Option<NodeId> {
        let was_empty = match &self.node(seq).kind {
            NodeKind::Sequence(items) => items.is_empty(),
            _ => return None,
        };
        let kind = self.kind_from_value(&value, ScalarStyle::Plain);
        let item = self.alloc(Node::synthetic(kind));
        if let NodeKind::Sequence(items) = &mut self.nodes[seq.0].kind {
            items.push(Slot {
                node: item,
                alias: None,
            });
        }
        self.modified = true;

        let node = self.node(seq);
        let Some(info) = node.source_info.clone() else {
            return Some(item);
        };
        let layout = node.layout;
        let edit = if layout.flow {
            let close = info.end_offset().saturating_sub(1);
            if was_empty {
                Edit {
                    start: close,
                    end: close,
                    node: item,
                    kind: EditKind::Item {
                        indent: layout.indent,
                        flow: true,
                        prefix: "",
                    },
                    crlf: false,
                }
            } else {
                let at = scan::prev_content_end(&self.source, close);
                let prefix = if self.source[..at].ends_with(',') { " " } else { ", " };
                Edit {
                    start: at,
                    end: at,
                    node: item,
                    kind: EditKind::Item {
                        indent: layout.indent,
                        flow: true,
                        prefix,
                    },
                    crlf: false,
                }
            }
        } else {
            let mut at = scan::line_end(&self.source, info.end_offset());
            let crlf = scan::crlf_at(&self.source, at);
            if self.source[..at].ends_with('\r') {
                at -= 1;
            }
            Edit {
                start: at,
                end: at,
                node: item,
                kind: EditKind::Item {
                    indent: layout.indent,
                    flow: false,
                    prefix: "",
                },
                crlf,
            }
        };
        self.add_edit(edit);
        Some(item)
    }

    /// The document text with every edit applied. Returns the source
    /// unchanged when nothing was edited.
    pub fn to_text(&self) -> String {
        if self.edits.is_empty() {
            return self.source.clone();
        }
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| (edit.start, edit.end));

        let mut out = String::with_capacity(self.source.len() + 64);
        let mut pos = 0;
        for edit in edits {
            let start = edit.start.max(pos);
            out.push_str(&self.source[pos..start]);
            out.push_str(&self.render(edit));
            pos = edit.end.max(start);
        }
        out.push_str(&self.source[pos..]);
        out
    }

    fn render(&self, edit: &Edit) -> String {
        let text = match edit.kind {
            EditKind::Inline {
                style,
                indent,
                lead,
            } => {
                let text = match &self.node(edit.node).kind {
                    NodeKind::Scalar(scalar) => emit::inline(&scalar.value, style, indent),
                    _ => emit::flow(&self.value_of(edit.node)),
                };
                if lead { format!(" {text}") } else { text }
            }
            EditKind::Item {
                indent,
                flow,
                prefix,
            } => {
                let value = self.value_of(edit.node);
                if flow {
                    format!("{prefix}{}", emit::flow(&value))
                } else {
                    format!("\n{}- {}", " ".repeat(indent), emit::block(&value, indent + 2))
                }
            }
        };
        if edit.crlf { text.replace('\n', "\r\n") } else { text }
    }

    /// Edit that overwrites the text of `old` with the content of `new`.
    fn inline_edit(&self, old: NodeId, new: NodeId) -> Option<Edit> {
        let node = self.node(old);
        let info = node.source_info.as_ref()?;
        Some(Edit {
            start: info.offset,
            end: info.end_offset(),
            node: new,
            kind: EditKind::Inline {
                style: self.scalar_style(old),
                indent: node.layout.indent,
                lead: node.layout.empty,
            },
            crlf: scan::crlf_at(&self.source, info.offset),
        })
    }

    fn add_edit(&mut self, edit: Edit) {
        if self.edits.iter().any(|existing| existing.covers(&edit)) {
            return;
        }
        self.edits.retain(|existing| !edit.covers(existing));
        self.edits.push(edit);
    }

    fn scalar_style(&self, id: NodeId) -> ScalarStyle {
        self.node(id)
            .as_scalar()
            .map(|scalar| scalar.style)
            .unwrap_or_default()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Node content for a value; collections get fresh child nodes.
    fn kind_from_value(&mut self, value: &Value, style: ScalarStyle) -> NodeKind {
        match value {
            Value::Sequence(items) => {
                let slots = items
                    .iter()
                    .map(|item| {
                        let kind = self.kind_from_value(item, ScalarStyle::Plain);
                        Slot {
                            node: self.alloc(Node::synthetic(kind)),
                            alias: None,
                        }
                    })
                    .collect();
                NodeKind::Sequence(slots)
            }
            Value::Mapping(map) => {
                let entries = map
                    .iter()
                    .map(|(key, item)| {
                        let kind = self.kind_from_value(item, ScalarStyle::Plain);
                        Entry {
                            key: key.clone(),
                            merge: false,
                            slot: Slot {
                                node: self.alloc(Node::synthetic(kind)),
                                alias: None,
                            },
                        }
                    })
                    .collect();
                NodeKind::Mapping(entries)
            }
            scalar => NodeKind::Scalar(Scalar {
                value: scalar.clone(),
                style,
            }),
        }
    }
}
