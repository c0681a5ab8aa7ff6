//! Error types for loading and writing YAML documents.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for chartmerge-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or writing a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The input is not valid YAML.
    #[error("Parse error: {message}{}", fmt_location(.location))]
    Parse {
        message: String,
        location: Option<SourceInfo>,
    },

    /// The edited document could not be written back as loadable YAML.
    #[error("Serialization error: {message}")]
    Serialize { message: String },
}

fn fmt_location(location: &Option<SourceInfo>) -> String {
    match location {
        Some(info) => match &info.file {
            Some(file) => format!(" ({}:{}:{})", file, info.line, info.col),
            None => format!(" (line {}, column {})", info.line, info.col),
        },
        None => String::new(),
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::Parse {
            message: err.to_string(),
            location: None,
        }
    }
}
