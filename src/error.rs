//! Error types shared by every pipeline command.
//!
//! Only conditions that must abort a run live here. Data-quality problems
//! (unparseable dates, missing names, conflicting facts) are counted and
//! reported by the mergers instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::FetchError;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading or writing a store or batch file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was read but is not valid JSON for the expected shape
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON document parsed but its top-level layout is unusable
    #[error("unexpected layout in {}: {detail}", path.display())]
    Shape { path: PathBuf, detail: String },

    /// A store's nested layout cannot hold the record being merged
    #[error("unexpected store layout: {0}")]
    Layout(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ArchiveError::Json {
            path: path.into(),
            source,
        }
    }

    pub fn shape(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ArchiveError::Shape {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

impl From<toml::de::Error> for ArchiveError {
    fn from(e: toml::de::Error) -> Self {
        ArchiveError::Config(e.to_string())
    }
}
