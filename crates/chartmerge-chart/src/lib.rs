//! Helm chart side of chartmerge.
//!
//! This crate finds the values documents of a chart ([`PathFilter`]), reads
//! its `Chart.yaml` ([`ChartMetadata`]), and runs a merge over a whole chart
//! or a single document ([`consolidate_chart`], [`apply_to_chart`],
//! [`apply_to_file`]). Every target document is handled on its own: a
//! document that fails is reported in the [`BatchSummary`] and the rest of
//! the batch still runs.
//!
//! ```no_run
//! use chartmerge_chart::{ApplyMode, ConsolidateOptions, FilterConfig, PathFilter};
//! use chartmerge_chart::{apply_to_chart, consolidate_chart};
//! use std::path::Path;
//!
//! let filter = PathFilter::new(&FilterConfig::default())?;
//! let options = ConsolidateOptions { filter: filter.clone(), ..Default::default() };
//! let source = consolidate_chart(Path::new("charts/new"), &options)?;
//! let summary = apply_to_chart(&source.desired, Path::new("charts/current"), &filter, ApplyMode::Write)?;
//! println!("{} updated, {} failed", summary.updated(), summary.failed());
//! # Ok::<(), chartmerge_chart::ChartError>(())
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod pipeline;

pub use backup::copy_beside;
pub use config::{FilterConfig, MergeConfig};
pub use error::{ChartError, Result};
pub use filter::{DocumentLocation, PathFilter};
pub use metadata::{ChartMetadata, Dependency, disabled_components, is_chart};
pub use pipeline::{
    ApplyMode, BatchSummary, Consolidated, ConsolidateOptions, DocumentFailure, DocumentReport, Outcome,
    apply_to_chart, apply_to_file, consolidate_chart, consolidate_file,
};
