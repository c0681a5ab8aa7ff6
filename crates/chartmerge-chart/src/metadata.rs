//! Chart metadata from `Chart.yaml`.

use std::collections::BTreeSet;
use std::path::Path;

use chartmerge_core::AnnotatedNode;
use chartmerge_yaml::Value;
use serde::{Deserialize, Deserializer};

use crate::error::{ChartError, Result};

pub const CHART_FILE: &str = "Chart.yaml";

/// Whether `path` is a chart directory.
pub fn is_chart(path: &Path) -> bool {
    path.join(CHART_FILE).is_file()
}

/// The parts of `Chart.yaml` a merge needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub app_version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Versions are often written unquoted (`appVersion: 1.16`).
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

impl ChartMetadata {
    /// Load `Chart.yaml` from a chart directory.
    pub fn load(chart: &Path) -> Result<Self> {
        if !is_chart(chart) {
            return Err(ChartError::NotAChart(chart.to_path_buf()));
        }
        let path = chart.join(CHART_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| ChartError::io(&path, e))?;
        serde_yaml::from_str(&content).map_err(|e| ChartError::InvalidMetadata {
            path: chart.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Dependency names and subcharts under `charts/`, sorted and
    /// de-duplicated.
    pub fn components(&self, chart: &Path) -> Vec<String> {
        let mut components: BTreeSet<String> = self.dependencies.iter().map(|d| d.name.clone()).collect();

        if let Ok(entries) = std::fs::read_dir(chart.join("charts")) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_dir() && is_chart(&path) {
                    components.insert(entry.file_name().to_string_lossy().into_owned());
                }
            }
        }

        components.into_iter().collect()
    }
}

/// Components whose top-level section in `desired` is switched off with
/// `enabled: false`.
pub fn disabled_components(components: &[String], desired: &AnnotatedNode) -> Vec<String> {
    components
        .iter()
        .filter(|name| {
            desired
                .get(name)
                .and_then(|section| section.get("enabled"))
                .and_then(AnnotatedNode::as_leaf)
                .is_some_and(|leaf| leaf.value == Value::Bool(false))
        })
        .cloned()
        .collect()
}
