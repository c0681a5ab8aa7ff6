//! YAML loader that builds arena documents from `yaml-rust2` events.

use crate::document::{Document, Entry, Layout, Node, NodeId, NodeKind, Scalar, Slot};
use crate::scan::{self, LineIndex};
use crate::value::{ScalarStyle, Value, resolve_plain};
use crate::{AliasUse, Error, Result, SourceInfo};
use std::collections::HashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parse YAML from a string into a [`Document`].
///
/// Only the first document of a multi-document stream is loaded. Input with
/// no document at all (empty, or only comments) gives a document without a
/// root.
///
/// # Example
///
/// ```rust
/// use chartmerge_yaml::{Value, parse};
///
/// let doc = parse("image:\n  tag: \"1.2\"\n").unwrap();
/// assert_eq!(doc.get("image.tag"), Some(Value::from("1.2")));
/// ```
///
/// # Errors
///
/// Returns [`Error::Parse`] if the input is not valid YAML.
pub fn parse(content: &str) -> Result<Document> {
    parse_impl(content, None)
}

/// Parse YAML from a string with an associated file name.
///
/// The name is recorded in the source information of every node and in
/// parse errors.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the input is not valid YAML.
pub fn parse_file(content: &str, filename: &str) -> Result<Document> {
    parse_impl(content, Some(filename))
}

/// Render a document back to text.
///
/// An unmodified document is returned exactly as it was loaded. Edited text
/// is parsed again before it is handed out.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if the edited text no longer loads.
pub fn serialize(doc: &Document) -> Result<String> {
    let text = doc.to_text();
    if text != doc.source() {
        parse(&text).map_err(|err| Error::Serialize {
            message: format!("edited document no longer loads: {err}"),
        })?;
    }
    Ok(text)
}

fn parse_impl(content: &str, filename: Option<&str>) -> Result<Document> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = DocumentBuilder::new(content, filename);

    if let Err(err) = parser.load(&mut builder, false) {
        let offset = builder.lines.byte_offset(err.marker());
        let (line, col) = builder.lines.position(content, offset);
        return Err(Error::Parse {
            message: err.info().to_string(),
            location: Some(SourceInfo::new(
                filename.map(str::to_string),
                offset,
                line,
                col,
                0,
            )),
        });
    }

    builder.finish()
}

/// Receives parser events and fills the node arena.
struct DocumentBuilder<'a> {
    source: &'a str,
    filename: Option<String>,
    lines: LineIndex,
    nodes: Vec<Node>,
    /// Parser anchor ids to the nodes that define them.
    anchors: HashMap<usize, NodeId>,
    stack: Vec<Frame>,
    root: Option<Slot>,
    /// First alias found inside the node it refers to.
    recursive: Option<Error>,
}

/// A collection under construction.
enum Frame {
    Sequence {
        id: NodeId,
        items: Vec<Slot>,
        end: usize,
    },
    Mapping {
        id: NodeId,
        entries: Vec<Entry>,
        pending: Option<PendingKey>,
        end: usize,
        /// Anchor id of a block mapping whose start is not yet known. The
        /// parser marks a block mapping at the `:` of its first key, so the
        /// start is fixed when that key arrives.
        unplaced: Option<usize>,
    },
}

struct PendingKey {
    text: String,
    merge: bool,
}

impl<'a> DocumentBuilder<'a> {
    fn new(source: &'a str, filename: Option<&str>) -> Self {
        Self {
            source,
            filename: filename.map(str::to_string),
            lines: LineIndex::new(source),
            nodes: Vec::new(),
            anchors: HashMap::new(),
            stack: Vec::new(),
            root: None,
            recursive: None,
        }
    }

    fn finish(self) -> Result<Document> {
        if let Some(err) = self.recursive {
            return Err(err);
        }
        Ok(Document::from_parts(self.source.to_string(), self.filename, self.nodes, self.root))
    }

    fn source_info(&self, offset: usize, end: usize) -> SourceInfo {
        let (line, col) = self.lines.position(self.source, offset);
        SourceInfo::new(
            self.filename.clone(),
            offset,
            line,
            col,
            end.saturating_sub(offset),
        )
    }

    fn in_flow(&self) -> bool {
        self.stack.iter().any(|frame| {
            let id = match frame {
                Frame::Sequence { id, .. } | Frame::Mapping { id, .. } => *id,
            };
            self.nodes[id.0].layout.flow
        })
    }

    /// Whether `id` is a collection still being built.
    fn is_open(&self, id: NodeId) -> bool {
        self.stack.iter().any(|frame| match frame {
            Frame::Sequence { id: open, .. } | Frame::Mapping { id: open, .. } => *open == id,
        })
    }

    fn expects_key(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Mapping { pending: None, .. }))
    }

    fn alloc(&mut self, node: Node, anchor_id: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        if anchor_id > 0 {
            self.anchors.insert(anchor_id, id);
        }
        id
    }

    fn anchor_name(&self, anchor_id: usize, offset: usize) -> Option<String> {
        if anchor_id == 0 {
            return None;
        }
        scan::anchor_name(self.source, offset)
    }

    /// Attach a finished node to its parent.
    fn complete(&mut self, slot: Slot, end: usize) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(slot);
                }
            }
            Some(Frame::Sequence {
                items, end: last, ..
            }) => {
                items.push(slot);
                *last = (*last).max(end);
            }
            Some(Frame::Mapping {
                entries,
                pending,
                end: last,
                ..
            }) => {
                *last = (*last).max(end);
                match pending.take() {
                    Some(key) => entries.push(Entry {
                        key: key.text,
                        merge: key.merge,
                        slot,
                    }),
                    None => {
                        // A collection or alias used as a key.
                        let text = detached(&self.nodes, slot.node, 0).key_text();
                        *pending = Some(PendingKey { text, merge: false });
                    }
                }
            }
        }
    }

    fn on_scalar(
        &mut self,
        value: String,
        style: TScalarStyle,
        anchor_id: usize,
        tag: Option<Tag>,
        offset: usize,
    ) {
        let style = match style {
            TScalarStyle::Plain => ScalarStyle::Plain,
            TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            TScalarStyle::Literal => ScalarStyle::Literal,
            _ => ScalarStyle::Folded,
        };
        // Block scalar spans start at the `|`/`>` header.
        let offset = if style.is_block() {
            scan::block_header(self.source, offset)
        } else {
            offset
        };
        let empty = style == ScalarStyle::Plain
            && (value.is_empty() || (value == "~" && !self.source[offset..].starts_with('~')));

        let (start, end, indent) = if empty {
            let after = scan::skip_properties(self.source, offset);
            let at = if after > offset {
                after
            } else {
                scan::prev_content_end(self.source, offset)
            };
            (at, at, 0)
        } else {
            let (end, block_indent) =
                scan::scalar_end(self.source, offset, style, &value, self.in_flow());
            let col = self.lines.position(self.source, offset).1 - 1;
            (offset, end, block_indent.unwrap_or(col))
        };

        let tag = tag.map(|t| t.suffix);
        let resolved = if empty {
            Value::Null
        } else if style == ScalarStyle::Plain && tag.as_deref() != Some("str") {
            resolve_plain(&value)
        } else {
            Value::String(value.clone())
        };

        if self.expects_key() && !empty {
            self.place_mapping(start);
            if anchor_id > 0 {
                let node = Node {
                    kind: NodeKind::Scalar(Scalar {
                        value: resolved,
                        style,
                    }),
                    anchor: self.anchor_name(anchor_id, offset),
                    tag,
                    source_info: Some(self.source_info(start, end)),
                    layout: Layout::default(),
                };
                self.alloc(node, anchor_id);
            }
            if let Some(Frame::Mapping {
                pending, end: last, ..
            }) = self.stack.last_mut()
            {
                let merge = style == ScalarStyle::Plain && value == "<<";
                *pending = Some(PendingKey { text: value, merge });
                *last = (*last).max(end);
            }
            return;
        }

        let node = Node {
            kind: NodeKind::Scalar(Scalar {
                value: resolved,
                style,
            }),
            anchor: self.anchor_name(anchor_id, offset),
            tag,
            source_info: Some(self.source_info(start, end)),
            layout: Layout {
                flow: false,
                indent,
                empty,
            },
        };
        let id = self.alloc(node, anchor_id);
        self.complete(Slot { node: id, alias: None }, end);
    }

    /// Move the start of an unplaced block mapping to its first key.
    fn place_mapping(&mut self, key_start: usize) {
        let Some(Frame::Mapping { id, unplaced, .. }) = self.stack.last_mut() else {
            return;
        };
        let Some(anchor_id) = unplaced.take() else {
            return;
        };
        let id = *id;
        let start = self.nodes[id.0]
            .source_info
            .as_ref()
            .map_or(key_start, |info| info.offset.min(key_start));
        let anchor = self.anchor_name(anchor_id, start);
        let info = self.source_info(start, start);
        let col = info.col - 1;
        let node = &mut self.nodes[id.0];
        node.anchor = anchor;
        node.source_info = Some(info);
        node.layout.indent = col;
    }

    fn on_collection_start(&mut self, mapping: bool, anchor_id: usize, tag: Option<Tag>, offset: usize) {
        let flow = self.source[offset..].starts_with(['[', '{']);
        let col = self.lines.position(self.source, offset).1 - 1;
        let kind = if mapping {
            NodeKind::Mapping(Vec::new())
        } else {
            NodeKind::Sequence(Vec::new())
        };
        let unplaced = (mapping && !flow).then_some(anchor_id);
        let node = Node {
            kind,
            anchor: if unplaced.is_some() {
                None
            } else {
                self.anchor_name(anchor_id, offset)
            },
            tag: tag.map(|t| t.suffix),
            source_info: Some(self.source_info(offset, offset)),
            layout: Layout {
                flow,
                indent: col,
                empty: false,
            },
        };
        let id = self.alloc(node, anchor_id);
        let end = if flow { offset + 1 } else { offset };
        self.stack.push(if mapping {
            Frame::Mapping {
                id,
                entries: Vec::new(),
                pending: None,
                end,
                unplaced,
            }
        } else {
            Frame::Sequence {
                id,
                items: Vec::new(),
                end,
            }
        });
    }

    fn on_collection_end(&mut self, offset: usize) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let (id, kind, last) = match frame {
            Frame::Sequence { id, items, end } => (id, NodeKind::Sequence(items), end),
            Frame::Mapping {
                id, entries, end, ..
            } => (id, NodeKind::Mapping(entries), end),
        };

        let node = &self.nodes[id.0];
        let end = if node.layout.flow {
            let close = if node.is_mapping() { '}' } else { ']' };
            if self.source[offset..].starts_with(close) {
                offset + 1
            } else {
                self.source[last..]
                    .find(close)
                    .map_or(self.source.len(), |i| last + i + 1)
            }
        } else {
            last
        };

        let start = node.source_info.as_ref().map_or(offset, |info| info.offset);
        let info = self.source_info(start, end);
        let node = &mut self.nodes[id.0];
        node.kind = kind;
        node.source_info = Some(info);
        self.complete(Slot { node: id, alias: None }, end);
    }

    fn on_alias(&mut self, anchor_id: usize, offset: usize) {
        let Some(&node) = self.anchors.get(&anchor_id) else {
            return;
        };
        let (name, end) = scan::alias_token(self.source, offset);
        if self.is_open(node) {
            // An alias inside the node it names would make the document infinite.
            if self.recursive.is_none() {
                self.recursive = Some(Error::Parse {
                    message: format!("alias *{name} refers to a node that contains it"),
                    location: Some(self.source_info(offset, end)),
                });
            }
            return;
        }
        if self.expects_key() {
            self.place_mapping(offset);
        }
        let alias = AliasUse {
            name,
            source_info: self.source_info(offset, end),
        };
        self.complete(
            Slot {
                node,
                alias: Some(alias),
            },
            end,
        );
    }
}

impl MarkedEventReceiver for DocumentBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        let offset = self.lines.byte_offset(&marker);
        match ev {
            Event::Scalar(value, style, anchor_id, tag) => {
                self.on_scalar(value, style, anchor_id, tag, offset);
            }

            Event::SequenceStart(anchor_id, tag) => {
                self.on_collection_start(false, anchor_id, tag, offset);
            }
            Event::MappingStart(anchor_id, tag) => {
                self.on_collection_start(true, anchor_id, tag, offset);
            }
            Event::SequenceEnd | Event::MappingEnd => self.on_collection_end(offset),

            Event::Alias(anchor_id) => self.on_alias(anchor_id, offset),

            // Stream and document boundaries carry no content.
            _ => {}
        }
    }
}

/// Plain value of a node while the arena is still being built.
fn detached(nodes: &[Node], id: NodeId, depth: usize) -> Value {
    if depth > crate::MAX_DEPTH {
        return Value::Null;
    }
    match &nodes[id.0].kind {
        NodeKind::Scalar(scalar) => scalar.value.clone(),
        NodeKind::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|slot| detached(nodes, slot.node, depth + 1))
                .collect(),
        ),
        NodeKind::Mapping(entries) => Value::Mapping(
            entries
                .iter()
                .map(|entry| (entry.key.clone(), detached(nodes, entry.slot.node, depth + 1)))
                .collect(),
        ),
    }
}
