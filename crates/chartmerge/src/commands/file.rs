//! File command - merge one values file into another.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chartmerge_chart::{ApplyMode, BatchSummary, apply_to_file, consolidate_file, copy_beside};
use tracing::info;

use crate::CommonArgs;

pub struct FileArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    pub common: CommonArgs,
}

/// Execute the file command. Returns the number of documents that failed.
pub fn execute(args: FileArgs) -> Result<usize> {
    let dry_run = args.common.compare_only;
    info!(source = %args.source.display(), target = %args.target.display(), dry_run, "merging file");

    let consolidated =
        consolidate_file(&args.source).with_context(|| format!("Failed to read {}", args.source.display()))?;

    let target = if args.common.output && !dry_run {
        copy_beside(&args.target).with_context(|| format!("Failed to copy {}", args.target.display()))?
    } else {
        args.target.clone()
    };

    let mode = if dry_run { ApplyMode::DryRun } else { ApplyMode::Write };
    let summary = BatchSummary {
        documents: vec![apply_to_file(&consolidated.desired, &target, mode)],
    };

    super::print_summary(&summary, dry_run);
    if let Some(folder) = &args.common.compare_folder {
        super::write_report(folder, &args.source, &target, &summary, &[], dry_run)?;
    }
    Ok(summary.failed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn files(temp: &TempDir) -> (PathBuf, PathBuf) {
        let source = temp.path().join("new.yaml");
        let target = temp.path().join("values.yaml");
        fs::write(&source, "image:\n  tag: '2.0'\nreplicas: 3\n").unwrap();
        fs::write(&target, "image:\n  tag: \"1.0\"  # release\n").unwrap();
        (source, target)
    }

    #[test]
    fn test_updates_target_in_place() {
        let temp = TempDir::new().unwrap();
        let (source, target) = files(&temp);
        let failed = execute(FileArgs {
            source,
            target: target.clone(),
            common: CommonArgs::default(),
        })
        .unwrap();
        assert_eq!(failed, 0);
        assert_eq!(fs::read_to_string(&target).unwrap(), "image:\n  tag: \"2.0\"  # release\n");
    }

    #[test]
    fn test_output_writes_a_copy() {
        let temp = TempDir::new().unwrap();
        let (source, target) = files(&temp);
        execute(FileArgs {
            source,
            target: target.clone(),
            common: CommonArgs {
                output: true,
                ..Default::default()
            },
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "image:\n  tag: \"1.0\"  # release\n");
        assert_eq!(
            fs::read_to_string(temp.path().join("values_copy1.yaml")).unwrap(),
            "image:\n  tag: \"2.0\"  # release\n"
        );
    }

    #[test]
    fn test_compare_only_writes_report() {
        let temp = TempDir::new().unwrap();
        let (source, target) = files(&temp);
        let reports = temp.path().join("reports");
        fs::create_dir(&reports).unwrap();

        execute(FileArgs {
            source,
            target: target.clone(),
            common: CommonArgs {
                compare_only: true,
                compare_folder: Some(reports.clone()),
                ..Default::default()
            },
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "image:\n  tag: \"1.0\"  # release\n");
        let report = fs::read_to_string(reports.join(super::super::REPORT_FILE)).unwrap();
        assert!(report.contains("status: updated"));
        assert!(report.contains("path: image.tag"));
    }

    #[test]
    fn test_broken_target_counts_as_failure() {
        let temp = TempDir::new().unwrap();
        let (source, target) = files(&temp);
        fs::write(&target, "image: {tag\n").unwrap();
        let failed = execute(FileArgs {
            source,
            target,
            common: CommonArgs::default(),
        })
        .unwrap();
        assert_eq!(failed, 1);
    }
}
