//! # chartmerge-yaml
//!
//! Format-preserving YAML documents with anchor/alias identity.
//!
//! A [`Document`] is an arena of nodes parsed from `yaml-rust2` events. Every
//! node remembers where it came from in the source text, so a document can be
//! edited in place and written back without disturbing comments, key order or
//! quoting of anything that was not touched.
//!
//! ## Design
//!
//! - **Arena handles**: nodes live in a `Vec` and are addressed by [`NodeId`].
//!   An alias resolves to the *same* handle as its anchor, so mutating through
//!   either view mutates the single underlying node.
//! - **Span edits**: mutations record which source span they overwrite. The
//!   replacement text is rendered from the arena when the document is turned
//!   back into text, so an unmodified document round-trips byte for byte.
//!
//! ## Example
//!
//! ```rust
//! use chartmerge_yaml::{Value, parse};
//!
//! let mut doc = parse("replicas: \"2\" # keep me\n").unwrap();
//! let root = doc.root().unwrap();
//! let entry = doc.lookup(root, "replicas").unwrap();
//! doc.replace(entry.slot_ref(), Value::String("3".into()));
//! assert_eq!(doc.to_text(), "replicas: \"3\" # keep me\n");
//! ```

mod document;
mod emit;
mod error;
mod parser;
mod path;
mod scan;
mod source_info;
mod value;

pub use document::{
    AliasUse, Document, Entry, EntryRef, MAX_DEPTH, Node, NodeId, NodeKind, Scalar, Slot,
    SlotRef,
};
pub use error::{Error, Result};
pub use parser::{parse, parse_file, serialize};
pub use path::{PathSegment, StructuralPath};
pub use source_info::SourceInfo;
pub use value::{ScalarStyle, Value};
