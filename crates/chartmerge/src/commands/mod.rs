//! Command implementations for the chartmerge CLI
//!
//! Each command module handles the CLI interface and delegates to
//! chartmerge-chart for the merge itself.

pub mod file;
pub mod folder;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chartmerge_chart::{BatchSummary, DocumentFailure, DocumentReport, Outcome};
use serde::Serialize;

pub const REPORT_FILE: &str = "chartmerge-report.yaml";

pub fn yaml_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.is_file() {
        return Err(format!("{value} is not a valid file."));
    }
    if !matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")) {
        return Err(format!("{value} is not a YAML file."));
    }
    Ok(path)
}

pub fn chart_folder(value: &str) -> Result<PathBuf, String> {
    let path = existing_folder(value)?;
    if !path.join("Chart.yaml").exists() {
        return Err("Missing 'Chart.yaml'. Not a Helm chart.".to_string());
    }
    if !path.join("templates").is_dir() {
        return Err("Missing 'templates' directory. Not a Helm chart.".to_string());
    }
    Ok(path)
}

pub fn existing_folder(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.is_dir() {
        return Err(format!("{value} is not a valid folder."));
    }
    Ok(path)
}

/// Print one line per document and a closing tally.
pub fn print_summary(summary: &BatchSummary, dry_run: bool) {
    for doc in &summary.documents {
        match &doc.outcome {
            Outcome::Updated => {
                let verb = if dry_run { "would update" } else { "updated" };
                println!("{verb:<12} {} ({} change(s))", doc.identifier, doc.report.len());
                for change in &doc.report.changes {
                    println!("{:<12}   {}", "", change.path);
                }
            }
            Outcome::Unchanged => println!("{:<12} {}", "unchanged", doc.identifier),
            Outcome::Failed(reason) => println!("{:<12} {}: {reason}", "failed", doc.identifier),
        }
    }
    println!(
        "{} updated, {} unchanged, {} failed",
        summary.updated(),
        summary.unchanged(),
        summary.failed()
    );
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct CompareReport<'a> {
    source: &'a Path,
    target: &'a Path,
    dry_run: bool,
    updated: usize,
    unchanged: usize,
    failed: usize,
    #[serde(skip_serializing_if = "no_failures")]
    source_failures: &'a [DocumentFailure],
    documents: &'a [DocumentReport],
}

fn no_failures(failures: &&[DocumentFailure]) -> bool {
    failures.is_empty()
}

/// Write the outcome of a run as YAML into `folder`.
pub fn write_report(
    folder: &Path,
    source: &Path,
    target: &Path,
    summary: &BatchSummary,
    source_failures: &[DocumentFailure],
    dry_run: bool,
) -> Result<PathBuf> {
    let report = CompareReport {
        source,
        target,
        dry_run,
        updated: summary.updated(),
        unchanged: summary.unchanged(),
        failed: summary.failed(),
        source_failures,
        documents: &summary.documents,
    };
    let yaml = serde_yaml::to_string(&report).context("Failed to serialize compare report")?;
    let path = folder.join(REPORT_FILE);
    std::fs::write(&path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(report = %path.display(), "compare report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartmerge_core::MergeReport;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_file_validation() {
        let temp = TempDir::new().unwrap();
        let yaml = temp.path().join("values.yml");
        fs::write(&yaml, "a: 1\n").unwrap();
        assert_eq!(yaml_file(yaml.to_str().unwrap()).unwrap(), yaml);

        let missing = temp.path().join("missing.yaml");
        assert!(yaml_file(missing.to_str().unwrap()).unwrap_err().contains("not a valid file"));
    }

    #[test]
    fn test_chart_folder_validation() {
        let temp = TempDir::new().unwrap();
        let err = chart_folder(temp.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("Chart.yaml"));
    }

    #[test]
    fn test_write_report() {
        let temp = TempDir::new().unwrap();
        let summary = BatchSummary {
            documents: vec![DocumentReport {
                identifier: "values.yaml".into(),
                path: "target/values.yaml".into(),
                outcome: Outcome::Unchanged,
                report: MergeReport::default(),
            }],
        };
        let path = write_report(temp.path(), Path::new("source"), Path::new("target"), &summary, &[], true).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("dry-run: true"));
        assert!(text.contains("identifier: values.yaml"));
        assert!(text.contains("status: unchanged"));
        assert!(!text.contains("source-failures"));
    }
}
