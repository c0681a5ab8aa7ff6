//! Batch merging of charts and documents
//!
//! The source side is read once into a desired-state tree; every target
//! document is then reconciled against it on its own. A document that cannot
//! be loaded, merged or written is reported as failed and the batch moves on.

use std::fs;
use std::path::{Path, PathBuf};

use chartmerge_core::{AnnotatedNode, MergeReport, annotate, consolidate, reconcile, remove_sections};
use chartmerge_yaml::parse_file;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{ChartError, Result};
use crate::filter::{DocumentLocation, PathFilter};
use crate::metadata::{ChartMetadata, disabled_components};

/// How the source chart is read.
#[derive(Debug, Clone, Default)]
pub struct ConsolidateOptions {
    pub filter: PathFilter,
    /// Fold only these documents, in this order.
    pub values_order: Option<Vec<String>>,
    /// Keep sections of disabled components.
    pub merge_disabled_components: bool,
}

/// A source document that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub identifier: String,
    pub reason: String,
}

/// The desired state read from a source.
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub desired: AnnotatedNode,
    pub app_version: Option<String>,
    /// Identifiers of the documents that were loaded.
    pub documents: Vec<String>,
    pub failures: Vec<DocumentFailure>,
    /// Top-level sections dropped because their component is disabled.
    pub removed_components: Vec<String>,
}

/// Read every source document of `chart` into one desired-state tree.
///
/// Fails only when `chart` is not a readable chart; broken documents are
/// logged and collected in [`Consolidated::failures`].
pub fn consolidate_chart(chart: &Path, options: &ConsolidateOptions) -> Result<Consolidated> {
    let meta = ChartMetadata::load(chart)?;
    info!(chart = %chart.display(), name = %meta.name, "processing source chart");
    let components = meta.components(chart);

    let mut documents = IndexMap::new();
    let mut failures = Vec::new();
    for location in options.filter.discover(chart) {
        match load_annotated(&location) {
            Ok(tree) => {
                debug!(document = %location.relative, leaves = tree.leaf_count(), "processed source document");
                documents.insert(location.relative, tree);
            }
            Err(err) => {
                error!(document = %location.relative, error = %err, "failed to process source document");
                failures.push(DocumentFailure {
                    identifier: location.relative,
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut desired = consolidate(&documents, options.values_order.as_deref());

    let mut removed_components = Vec::new();
    if !options.merge_disabled_components {
        let disabled = disabled_components(&components, &desired);
        removed_components = remove_sections(&mut desired, &disabled);
        if !removed_components.is_empty() {
            info!(components = ?removed_components, "dropping disabled components");
        }
    }

    Ok(Consolidated {
        desired,
        app_version: meta.app_version,
        documents: documents.into_keys().collect(),
        failures,
        removed_components,
    })
}

/// Read a single source document as the desired state.
pub fn consolidate_file(path: &Path) -> Result<Consolidated> {
    let location = DocumentLocation {
        path: path.to_path_buf(),
        relative: file_identifier(path),
    };
    let tree = load_annotated(&location)?;
    let mut documents = IndexMap::new();
    documents.insert(location.relative, tree);
    Ok(Consolidated {
        desired: consolidate(&documents, None),
        app_version: None,
        documents: documents.into_keys().collect(),
        failures: Vec::new(),
        removed_components: Vec::new(),
    })
}

fn load_annotated(location: &DocumentLocation) -> Result<AnnotatedNode> {
    let text = fs::read_to_string(&location.path).map_err(|e| ChartError::io(&location.path, e))?;
    let doc = parse_file(&text, &location.relative).map_err(|source| ChartError::Document {
        identifier: location.relative.clone(),
        source,
    })?;
    Ok(annotate(&doc, &location.relative))
}

fn file_identifier(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

/// Whether reconciled documents are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Write,
    /// Compute the changes but leave every document as it is.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "reason")]
pub enum Outcome {
    Updated,
    Unchanged,
    Failed(String),
}

/// What happened to one target document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub identifier: String,
    pub path: PathBuf,
    pub outcome: Outcome,
    pub report: MergeReport,
}

impl DocumentReport {
    fn failed(location: &DocumentLocation, err: impl std::fmt::Display) -> Self {
        let reason = err.to_string();
        error!(document = %location.relative, %reason, "failed to merge document");
        DocumentReport {
            identifier: location.relative.clone(),
            path: location.path.clone(),
            outcome: Outcome::Failed(reason),
            report: MergeReport::default(),
        }
    }
}

/// Per-document outcomes of a batch, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub documents: Vec<DocumentReport>,
}

impl BatchSummary {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.documents.iter().filter(|d| pred(&d.outcome)).count()
    }

    pub fn updated(&self) -> usize {
        self.count(|o| *o == Outcome::Updated)
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| *o == Outcome::Unchanged)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Total number of changed paths across all documents.
    pub fn changes(&self) -> usize {
        self.documents.iter().map(|d| d.report.len()).sum()
    }
}

/// Reconcile every target document of `chart` that `filter` lets through.
pub fn apply_to_chart(desired: &AnnotatedNode, chart: &Path, filter: &PathFilter, mode: ApplyMode) -> Result<BatchSummary> {
    if !chart.is_dir() {
        return Err(ChartError::NotAChart(chart.to_path_buf()));
    }
    info!(chart = %chart.display(), ?mode, "processing target chart");

    let mut summary = BatchSummary::default();
    for location in filter.discover(chart) {
        summary.documents.push(apply_to_location(desired, &location, mode));
    }
    info!(
        updated = summary.updated(),
        unchanged = summary.unchanged(),
        failed = summary.failed(),
        "target chart processed"
    );
    Ok(summary)
}

/// Reconcile a single target document.
pub fn apply_to_file(desired: &AnnotatedNode, path: &Path, mode: ApplyMode) -> DocumentReport {
    let location = DocumentLocation {
        path: path.to_path_buf(),
        relative: file_identifier(path),
    };
    apply_to_location(desired, &location, mode)
}

fn apply_to_location(desired: &AnnotatedNode, location: &DocumentLocation, mode: ApplyMode) -> DocumentReport {
    let text = match fs::read_to_string(&location.path) {
        Ok(text) => text,
        Err(err) => return DocumentReport::failed(location, ChartError::io(&location.path, err)),
    };
    let reconciled = match reconcile(desired, &text, &location.relative) {
        Ok(reconciled) => reconciled,
        Err(source) => {
            let err = ChartError::Document {
                identifier: location.relative.clone(),
                source,
            };
            return DocumentReport::failed(location, err);
        }
    };

    for change in &reconciled.report.changes {
        info!(document = %location.relative, path = %change.path, route = ?change.route, "updated");
    }

    let outcome = if !reconciled.is_changed() {
        debug!(document = %location.relative, "unchanged");
        Outcome::Unchanged
    } else if mode == ApplyMode::DryRun {
        info!(document = %location.relative, changes = reconciled.report.len(), "would update (dry run)");
        Outcome::Updated
    } else {
        if let Err(err) = fs::write(&location.path, &reconciled.text) {
            return DocumentReport::failed(location, ChartError::io(&location.path, err));
        }
        info!(document = %location.relative, changes = reconciled.report.len(), "written");
        Outcome::Updated
    };

    DocumentReport {
        identifier: location.relative.clone(),
        path: location.path.clone(),
        outcome,
        report: reconciled.report,
    }
}
