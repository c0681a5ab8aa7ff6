//! Error types for chartmerge-chart

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Not a Helm chart (missing Chart.yaml): {0}")]
    NotAChart(PathBuf),

    #[error("Invalid Chart.yaml in {path}: {message}")]
    InvalidMetadata { path: PathBuf, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to read merge config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Failed to load {identifier}: {source}")]
    Document {
        identifier: String,
        #[source]
        source: chartmerge_yaml::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChartError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChartError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;
