//! Merge into a single target document's text.

use crate::anchors::AnchorIndex;
use crate::annotate::AnnotatedNode;
use crate::apply::{MergeReport, apply};
use chartmerge_yaml::{Result, parse_file, serialize};

/// Outcome of reconciling one target document.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The rewritten text; identical to the input when nothing changed.
    pub text: String,
    pub report: MergeReport,
}

impl Reconciled {
    pub fn is_changed(&self) -> bool {
        !self.report.is_empty()
    }
}

/// Load `text`, apply `desired` to it and write it back.
///
/// # Errors
///
/// Returns a parse error if `text` is not valid YAML, or a serialization
/// error if the edited document cannot be written back as valid YAML.
pub fn reconcile(desired: &AnnotatedNode, text: &str, identifier: &str) -> Result<Reconciled> {
    let mut doc = parse_file(text, identifier)?;
    let anchors = AnchorIndex::build(&doc);
    let report = apply(desired, &mut doc, &anchors);
    let text = if report.is_empty() {
        text.to_string()
    } else {
        serialize(&doc)?
    };
    tracing::debug!(document = identifier, changes = report.len(), "reconciled");
    Ok(Reconciled { text, report })
}
