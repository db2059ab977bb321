//! Error taxonomy for admission, transfers, filesystem and registry failures.
//!
//! Only `Validation` (and registry failures during admission) ever reach the
//! caller of `start_download` synchronously; everything after admission is
//! recorded on the job and surfaces as a `Failed` state.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdmError {
    /// A required request field is missing or malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u32 },

    /// libcurl failed before a complete response was received.
    #[error("transfer failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },

    #[error("too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    /// Directory creation, file write or rename failed.
    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Stopped by cancel/pause or superseded by a newer job. Not a failure.
    #[error("job cancelled")]
    Cancelled,

    #[error("job registry: {0}")]
    Registry(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("worker task failed: {0}")]
    Internal(String),
}

impl PdmError {
    pub fn fs(context: impl Into<String>, source: io::Error) -> Self {
        PdmError::Filesystem {
            context: context.into(),
            source,
        }
    }

    /// True for HTTP status and transport failures.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            PdmError::HttpStatus { .. } | PdmError::Transport { .. } | PdmError::TooManyRedirects { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PdmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_flagged() {
        let e = PdmError::HttpStatus {
            url: "http://x/1.jpg".into(),
            status: 500,
        };
        assert!(e.is_network());
        assert_eq!(e.to_string(), "HTTP 500 for http://x/1.jpg");
        assert!(!PdmError::Cancelled.is_network());
        assert!(!PdmError::Validation("x".into()).is_network());
    }

    #[test]
    fn filesystem_error_keeps_context() {
        let e = PdmError::fs(
            "create /nope",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(e.to_string(), "create /nope: denied");
    }
}
