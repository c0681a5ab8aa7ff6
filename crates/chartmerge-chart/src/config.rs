//! Merge configuration
//!
//! A YAML file selecting which documents take part on each side of a merge:
//!
//! ```yaml
//! source:
//!   exclude-dirs: [templates, charts]
//!   exclude-files: [Chart.yaml]
//! target:
//!   exclude-dirs: [templates]
//! values-order:
//!   - values.yaml
//!   - config/production.yaml
//! merge-disabled-components: false
//! ```
//!
//! Omitted sections and fields fall back to [`FilterConfig::default`]; an
//! empty list switches a rule off.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};

/// Glob patterns over slash-separated paths relative to the chart root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterConfig {
    pub exclude_dirs: Vec<String>,
    pub exclude_files: Vec<String>,
    pub include_dirs: Vec<String>,
    pub include_files: Vec<String>,
}

impl FilterConfig {
    /// A filter that lets every YAML document through.
    pub fn unfiltered() -> Self {
        FilterConfig {
            exclude_dirs: Vec::new(),
            exclude_files: Vec::new(),
            include_dirs: Vec::new(),
            include_files: Vec::new(),
        }
    }
}

impl Default for FilterConfig {
    /// The values layout of a Documentum-style chart: top-level values and
    /// `config/` overlays take part, templates, subcharts, sizing profiles and
    /// secrets do not.
    fn default() -> Self {
        FilterConfig {
            exclude_dirs: to_strings(&[
                "templates",
                "charts",
                "mergeUtility",
                "addons",
                "platforms",
                ".editor-config",
            ]),
            exclude_files: to_strings(&[
                "Chart.yaml",
                "dockerimages-values.yaml",
                "documentum-resources-values-extra-large.yaml",
                "documentum-resources-values-large.yaml",
                "documentum-resources-values-medium.yaml",
                "documentum-resources-values-medium-large.yaml",
                "documentum-resources-values-small.yaml",
                "documentum-resources-values-small-medium.yaml",
                "documentum-resources-values-test-small.yaml",
                "config/passwords_k8api.yaml",
                "config/passwords_vault.yaml",
                "config/vault_secret.yaml",
            ]),
            include_dirs: to_strings(&["platforms"]),
            include_files: to_strings(&["aws.yaml"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Settings for a folder merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MergeConfig {
    /// Which source documents are read.
    pub source: FilterConfig,
    /// Which target documents are updated.
    pub target: FilterConfig,
    /// Source documents to fold, in order. All documents are folded when
    /// absent.
    pub values_order: Option<Vec<String>>,
    /// Keep sections of components that are switched off with
    /// `enabled: false`.
    pub merge_disabled_components: bool,
}

impl MergeConfig {
    /// Load a config file.
    ///
    /// An empty file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ChartError::io(path, e))?;
        let config = Self::from_yaml(&content).map_err(|message| ChartError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), ?config, "loaded merge config");
        Ok(config)
    }

    fn from_yaml(content: &str) -> std::result::Result<Self, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = MergeConfig::from_yaml(
            "target:\n  exclude-dirs: [templates]\nvalues-order: [values.yaml, extra.yaml]\n",
        )
        .unwrap();
        assert_eq!(config.source, FilterConfig::default());
        assert_eq!(config.target.exclude_dirs, vec!["templates".to_string()]);
        assert_eq!(config.target.exclude_files, FilterConfig::default().exclude_files);
        assert_eq!(
            config.values_order,
            Some(vec!["values.yaml".to_string(), "extra.yaml".to_string()])
        );
        assert!(!config.merge_disabled_components);
    }

    #[test]
    fn test_empty_file_is_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("merge.yaml");
        fs::write(&path, "# nothing yet\n").unwrap();
        assert_eq!(MergeConfig::load(&path).unwrap(), MergeConfig::default());
    }

    #[test]
    fn test_unknown_shape_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("merge.yaml");
        fs::write(&path, "source: [not, a, mapping]\n").unwrap();
        let err = MergeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ChartError::Config { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = MergeConfig::load(&temp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ChartError::Io { .. }));
    }
}
