//! Document discovery
//!
//! Walks a chart directory to find the YAML documents taking part in a merge.
//!
//! Patterns are shell globs matched against the whole path relative to the
//! chart root, with `/` separators; `*` also matches `/`. A directory matching
//! an exclude-dir pattern is not descended into unless an include-dir pattern
//! matches it as well. Files below a skipped directory are never seen, so
//! include-file patterns cannot bring them back. A file matching an
//! exclude-file pattern is skipped unless an include-file pattern matches it.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::FilterConfig;
use crate::error::{ChartError, Result};

/// A discovered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    /// Path on disk.
    pub path: PathBuf,
    /// Identifier relative to the chart root, `/`-separated.
    pub relative: String,
}

/// Compiled include/exclude rules.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exclude_dirs: Vec<Pattern>,
    exclude_files: Vec<Pattern>,
    include_dirs: Vec<Pattern>,
    include_files: Vec<Pattern>,
}

impl PathFilter {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(PathFilter {
            exclude_dirs: compile(&config.exclude_dirs)?,
            exclude_files: compile(&config.exclude_files)?,
            include_dirs: compile(&config.include_dirs)?,
            include_files: compile(&config.include_files)?,
        })
    }

    /// A filter that skips nothing.
    pub fn unfiltered() -> Self {
        PathFilter::default()
    }

    pub fn skips_dir(&self, relative: &str) -> bool {
        any_match(&self.exclude_dirs, relative) && !any_match(&self.include_dirs, relative)
    }

    pub fn skips_file(&self, relative: &str) -> bool {
        any_match(&self.exclude_files, relative) && !any_match(&self.include_files, relative)
    }

    /// Find every `.yaml`/`.yml` file under `root` that the rules let
    /// through. Entries are visited in file-name order, so the result is
    /// deterministic.
    pub fn discover(&self, root: &Path) -> Vec<DocumentLocation> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_pruned(root, e));

        let mut documents = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || !is_yaml(entry.path()) {
                continue;
            }
            let Some(relative) = relative_identifier(root, entry.path()) else {
                continue;
            };
            if self.skips_file(&relative) {
                debug!(%relative, "skipping excluded file");
                continue;
            }
            debug!(%relative, "discovered document");
            documents.push(DocumentLocation {
                path: entry.path().to_path_buf(),
                relative,
            });
        }
        documents
    }

    fn is_pruned(&self, root: &Path, entry: &walkdir::DirEntry) -> bool {
        // Never filter the root directory (depth 0)
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        match relative_identifier(root, entry.path()) {
            Some(relative) if self.skips_dir(&relative) => {
                debug!(%relative, "skipping excluded directory");
                true
            }
            _ => false,
        }
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|raw| {
            let normalized = normalize(raw);
            Pattern::new(&normalized).map_err(|e| ChartError::Pattern {
                pattern: raw.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// `\` becomes `/`, and a leading `./` or `/` is dropped.
fn normalize(pattern: &str) -> String {
    let pattern = pattern.replace('\\', "/");
    let pattern = pattern.strip_prefix("./").unwrap_or(&pattern);
    pattern.trim_start_matches('/').to_string()
}

fn any_match(patterns: &[Pattern], relative: &str) -> bool {
    patterns.iter().any(|p| p.matches(relative))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

fn relative_identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for file in files {
            let path = temp.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "a: 1\n").unwrap();
        }
        temp
    }

    fn relatives(found: &[DocumentLocation]) -> Vec<&str> {
        found.iter().map(|d| d.relative.as_str()).collect()
    }

    fn filter(
        exclude_dirs: &[&str],
        exclude_files: &[&str],
        include_dirs: &[&str],
        include_files: &[&str],
    ) -> PathFilter {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        PathFilter::new(&FilterConfig {
            exclude_dirs: owned(exclude_dirs),
            exclude_files: owned(exclude_files),
            include_dirs: owned(include_dirs),
            include_files: owned(include_files),
        })
        .unwrap()
    }

    #[test]
    fn test_discovers_yaml_in_name_order() {
        let temp = layout(&["values.yaml", "b.yml", "config/a.yaml", "README.md", "templates/x.tpl"]);
        let found = PathFilter::unfiltered().discover(temp.path());
        assert_eq!(relatives(&found), vec!["b.yml", "config/a.yaml", "values.yaml"]);
        assert_eq!(found[1].path, temp.path().join("config").join("a.yaml"));
    }

    #[test]
    fn test_excluded_directory_is_pruned() {
        let temp = layout(&["values.yaml", "templates/values.yaml", "charts/sub/values.yaml"]);
        let found = filter(&["templates", "charts"], &[], &[], &[]).discover(temp.path());
        assert_eq!(relatives(&found), vec!["values.yaml"]);
    }

    #[test]
    fn test_include_dir_rescues_directory() {
        let temp = layout(&["values.yaml", "platforms/aws.yaml", "addons/x.yaml"]);
        let found = filter(&["platforms", "addons"], &[], &["platforms"], &[]).discover(temp.path());
        assert_eq!(relatives(&found), vec!["platforms/aws.yaml", "values.yaml"]);
    }

    #[test]
    fn test_include_file_does_not_reach_into_pruned_directory() {
        let temp = layout(&["values.yaml", "addons/aws.yaml"]);
        let found = filter(&["addons"], &[], &[], &["addons/aws.yaml"]).discover(temp.path());
        assert_eq!(relatives(&found), vec!["values.yaml"]);
    }

    #[test]
    fn test_file_patterns_match_full_relative_path() {
        let temp = layout(&["Chart.yaml", "values.yaml", "config/secret.yaml", "other/secret.yaml"]);
        let found = filter(&[], &["Chart.yaml", "./config/secret.yaml"], &[], &[]).discover(temp.path());
        assert_eq!(relatives(&found), vec!["other/secret.yaml", "values.yaml"]);
    }

    #[test]
    fn test_include_file_overrides_exclude() {
        let temp = layout(&["values.yaml", "config/aws.yaml", "config/gcp.yaml"]);
        let found = filter(&[], &["config/*"], &[], &["*aws.yaml"]).discover(temp.path());
        assert_eq!(relatives(&found), vec!["config/aws.yaml", "values.yaml"]);
    }

    #[test]
    fn test_star_crosses_directories() {
        let f = filter(&[], &["*secret.yaml"], &[], &[]);
        assert!(f.skips_file("config/deep/secret.yaml"));
        assert!(!f.skips_file("config/secrets.yaml"));
    }

    #[test]
    fn test_default_chart_filter() {
        let temp = layout(&[
            "Chart.yaml",
            "values.yaml",
            "config/passwords_vault.yaml",
            "config/overrides.yaml",
            "templates/deployment.yaml",
            "platforms/aws.yaml",
            "documentum-resources-values-small.yaml",
        ]);
        let f = PathFilter::new(&FilterConfig::default()).unwrap();
        let found = f.discover(temp.path());
        assert_eq!(
            relatives(&found),
            vec!["config/overrides.yaml", "platforms/aws.yaml", "values.yaml"]
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathFilter::new(&FilterConfig {
            exclude_files: vec!["[".to_string()],
            ..FilterConfig::unfiltered()
        })
        .unwrap_err();
        assert!(matches!(err, ChartError::Pattern { .. }));
    }
}
