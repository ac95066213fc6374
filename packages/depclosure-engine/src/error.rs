use crate::config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClosureError>;

#[derive(Error, Debug)]
pub enum ClosureError {
    /// A binary package names a source package that is not in the snapshot.
    /// The snapshot is incomplete, so the whole run is aborted.
    #[error("Cannot find a source rpm for {name}-{version}-{release}")]
    SourceNotFound {
        name: String,
        version: String,
        release: String,
    },

    #[error("Invalid source rpm reference: {0}")]
    InvalidSourceRpm(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Closure walk aborted: {0}")]
    WalkAborted(String),
}

impl ClosureError {
    pub fn source_not_found(name: &str, version: &str, release: &str) -> Self {
        Self::SourceNotFound {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
        }
    }

    pub fn snapshot<E: std::fmt::Display>(e: E) -> Self {
        Self::Snapshot(e.to_string())
    }

    pub fn registry<E: std::fmt::Display>(e: E) -> Self {
        Self::Registry(e.to_string())
    }
}

/// Error category for registry retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Transient error - retry with backoff (e.g., 5xx, connection reset)
    Transient,
    /// Permanent error - give up immediately (e.g., 404, malformed document)
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }

    /// Classify an HTTP status code returned by the registry.
    pub fn from_status(status: u16) -> Self {
        if status == 429 || (500..600).contains(&status) {
            ErrorCategory::Transient
        } else {
            ErrorCategory::Permanent
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
