//! Error types for the Workgroup client.
//!
//! Every remote-call failure is classified at the point of the call into one
//! [`WorkgroupError`] variant. Local validation failures are raised before any
//! request is sent.

use thiserror::Error;

use crate::membership::MemberKind;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures of the authenticated HTTP channel itself (no HTTP status received).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Transport failure: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment {0} does not provide a Workgroup API")]
    UnsupportedEnvironment(String),

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Client certificate rejected: {0}")]
    Certificate(String),

    #[error("HTTP client setup failed: {0}")]
    Http(String),
}

// ---------------------------------------------------------------------------
// Workgroup errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum WorkgroupError {
    #[error("Workgroup {0} not found")]
    NotFound(String),

    #[error("Workgroup {0} already exists (or once existed)")]
    AlreadyExists(String),

    #[error("Permission denied for {0}")]
    PermissionDenied(String),

    #[error("Workgroup {0} has been deleted")]
    WorkgroupDeleted(String),

    #[error("Invalid {kind} identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        kind: MemberKind,
        identifier: String,
        reason: String,
    },

    #[error("Invalid search '{pattern}': {reason}")]
    InvalidSearch { pattern: String, reason: String },

    #[error("Invalid workgroup name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Unknown {property} value '{value}'")]
    InvalidProperty { property: &'static str, value: String },

    #[error("Workgroup {0} does not publish a privgroup")]
    PrivgroupUnavailable(String),

    #[error("Upstream API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected response ({status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WorkgroupError {
    /// True for the "workgroup deleted" condition, whether known locally or
    /// just discovered.
    pub fn is_deleted(&self) -> bool {
        matches!(self, WorkgroupError::WorkgroupDeleted(_))
    }

    /// True when the remote side reported that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkgroupError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, WorkgroupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorkgroupError::WorkgroupDeleted("test:1".to_string());
        assert_eq!(err.to_string(), "Workgroup test:1 has been deleted");
        assert!(err.is_deleted());

        let err = WorkgroupError::InvalidIdentifier {
            kind: MemberKind::Certificate,
            identifier: "host.example.com".to_string(),
            reason: "certificates may only be members of stem-owner workgroups".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid certificate identifier"));
    }

    #[test]
    fn test_transport_error_converts() {
        let err: WorkgroupError = TransportError::Timeout("read".to_string()).into();
        assert!(matches!(err, WorkgroupError::Transport(TransportError::Timeout(_))));
        assert!(!err.is_not_found());
    }
}
