//! Error types for the scraping pipeline.
//!
//! Errors are split by how the pipeline reacts to them:
//!
//! | Error | Source | Reaction |
//! |-------|--------|----------|
//! | [`RenderError`] | page navigation / download | retried for articles, halts one category for listings |
//! | [`StorageError`] | checkpoint and output files | fatal for the run |
//! | [`ConfigError`] | CLI flags, prompts, site file | reported before any network activity |
//!
//! Malformed pages and unparsable dates are not errors at all: they surface as
//! empty fields and `None` respectively.

use std::path::PathBuf;
use thiserror::Error;

/// A failure to obtain rendered HTML for a URL.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("timed out rendering {url}")]
    Timeout { url: String },

    #[error("transport error rendering {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP status {status} rendering {url}")]
    Status { url: String, status: u16 },
}

impl RenderError {
    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RenderError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            RenderError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// A failure reading or writing durable state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("spreadsheet error on {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    #[error("cannot load records back from {path}: format {format} is write-only")]
    UnsupportedLoad { path: PathBuf, format: &'static str },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Invalid run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no categories selected")]
    NoCategories,

    #[error("start page must be at least 1 (got {0})")]
    InvalidStartPage(u32),

    #[error("end page {end} is before start page {start} (use 0 to crawl until the last page)")]
    InvalidPageRange { start: u32, end: u32 },

    #[error("unsupported export format: {0} (expected csv, excel, json or txt)")]
    UnsupportedFormat(String),

    #[error("worker count must be at least 1")]
    InvalidWorkers,

    #[error("invalid filter date: {0} (expected YYYY-MM-DD, Buddhist years accepted)")]
    InvalidDate(String),

    #[error("invalid base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("cannot read site file {path}: {message}")]
    SiteFile { path: PathBuf, message: String },
}

/// A failure that aborts a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let e = ConfigError::InvalidPageRange { start: 3, end: 2 };
        assert!(e.to_string().contains("end page 2"));
        let e = ConfigError::UnsupportedFormat("pdf".into());
        assert!(e.to_string().contains("pdf"));
    }

    #[test]
    fn test_pipeline_error_wraps_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: PipelineError = StorageError::io("/tmp/x.json", io).into();
        assert!(e.to_string().contains("/tmp/x.json"));
        assert!(matches!(e, PipelineError::Storage(StorageError::Io { .. })));
    }
}
