//! Folder command - merge one Helm chart's values into another chart.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chartmerge_chart::{
    ApplyMode, ConsolidateOptions, MergeConfig, PathFilter, apply_to_chart, consolidate_chart, copy_beside,
};
use tracing::{info, warn};

use crate::CommonArgs;

pub struct FolderArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    pub common: CommonArgs,
    pub configuration: Vec<String>,
    pub merge_disabled_components: bool,
    pub config: Option<PathBuf>,
}

/// Command-line flags take precedence over the config file.
fn merge_config(args: &FolderArgs) -> Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::load(path)?,
        None => MergeConfig::default(),
    };
    if !args.configuration.is_empty() {
        config.values_order = Some(args.configuration.clone());
    }
    if args.merge_disabled_components {
        config.merge_disabled_components = true;
    }
    Ok(config)
}

/// Execute the folder command. Returns the number of documents that failed,
/// on either side.
pub fn execute(args: FolderArgs) -> Result<usize> {
    let dry_run = args.common.compare_only;
    let config = merge_config(&args)?;
    info!(
        source = %args.source.display(),
        target = %args.target.display(),
        dry_run,
        "merging chart"
    );

    let options = ConsolidateOptions {
        filter: PathFilter::new(&config.source)?,
        values_order: config.values_order.clone(),
        merge_disabled_components: config.merge_disabled_components,
    };
    let consolidated = consolidate_chart(&args.source, &options)
        .with_context(|| format!("Failed to read source chart {}", args.source.display()))?;
    if let Some(version) = &consolidated.app_version {
        info!(app_version = %version, documents = consolidated.documents.len(), "source chart loaded");
    }
    for failure in &consolidated.failures {
        warn!(document = %failure.identifier, reason = %failure.reason, "source document skipped");
    }

    let target = if args.common.output && !dry_run {
        copy_beside(&args.target).with_context(|| format!("Failed to copy {}", args.target.display()))?
    } else {
        args.target.clone()
    };

    let mode = if dry_run { ApplyMode::DryRun } else { ApplyMode::Write };
    let target_filter = PathFilter::new(&config.target)?;
    let summary = apply_to_chart(&consolidated.desired, &target, &target_filter, mode)?;

    super::print_summary(&summary, dry_run);
    if let Some(folder) = &args.common.compare_folder {
        super::write_report(folder, &args.source, &target, &summary, &consolidated.failures, dry_run)?;
    }
    Ok(summary.failed() + consolidated.failures.len())
}
