use std::path::PathBuf;

use thiserror::Error;

/// Failures of the findings store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize findings: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The store holds data that does not parse; writing would discard it.
    #[error("refusing to overwrite unparseable store {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-package failures raised while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("package not found in registry: {0}")]
    NotFound(String),

    #[error("no resolvable repository for {package}: {reason}")]
    Unresolvable { package: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("{url} returned a body that is not JSON: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tool} failed: {detail}")]
    Tooling { tool: String, detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScanError {
    /// Whether another attempt at the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::Network { .. } => true,
            ScanError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = ScanError::Status {
            url: "https://registry.npmjs.org/x".into(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        assert!(err.is_transient());

        let err = ScanError::Status {
            url: "https://registry.npmjs.org/x".into(),
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_fatal() {
        let err = ScanError::Status {
            url: "https://registry.npmjs.org/x".into(),
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert!(!err.is_transient());
        assert!(!ScanError::NotFound("x".into()).is_transient());
    }
}
