//! Structure-preserving merge of YAML values into existing documents.
//!
//! The merge runs in two halves:
//!
//! - **Desired state**: every source document is loaded and [`annotate`]d,
//!   then the annotated trees are combined with [`consolidate`] into a single
//!   tree describing what the targets should contain.
//! - **Targets**: each target document is loaded on its own, its anchors are
//!   indexed with [`AnchorIndex::build`], and [`apply`] walks the desired
//!   tree against it in lock-step, editing the target in place.
//!
//! [`reconcile`] runs the target half for one document's text.
//!
//! # Update rules
//!
//! Keys missing from a target mapping are never added. Sequence items beyond
//! the end of a target sequence are appended. A changed leaf is written to
//! the anchor that defines it when there is one, so every alias of the
//! anchor observes the new value; otherwise the value at the position is
//! replaced.
//!
//! # Example
//!
//! ```rust
//! use chartmerge_core::{annotate, consolidate, reconcile};
//! use chartmerge_yaml::parse;
//! use indexmap::IndexMap;
//!
//! let source = parse("replicas: 3\nextra: true\n").unwrap();
//! let mut documents = IndexMap::new();
//! documents.insert("values.yaml".to_string(), annotate(&source, "values.yaml"));
//! let desired = consolidate(&documents, None);
//!
//! let result = reconcile(&desired, "replicas: 1 # scaled\n", "values.yaml").unwrap();
//! assert_eq!(result.text, "replicas: 3 # scaled\n");
//! assert_eq!(result.report.paths()[0].to_string(), "replicas");
//! ```

mod aggregate;
mod anchors;
mod annotate;
mod apply;
mod reconcile;

pub use aggregate::{consolidate, deep_merge, remove_sections};
pub use anchors::AnchorIndex;
pub use annotate::{AnnotatedLeaf, AnnotatedNode, annotate};
pub use apply::{Change, MergeReport, Route, apply};
pub use reconcile::{Reconciled, reconcile};
