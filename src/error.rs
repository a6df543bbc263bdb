//! Error types for reconciliation passes.
//!
//! Errors are split by how far they propagate. [`SourceError`] and
//! [`AccountOpError`] are recorded in the pass report and never abort a pass.
//! [`TargetError`] and [`ConfigError`] are fatal and surface through
//! [`SyncError`] as the result of the pass itself.

use serde::Serialize;
use std::time::Duration;

/// Top-level error returned when a pass cannot run or cannot finish.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Configuration was rejected before the pass started
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The target directory could not be listed, so no plan was computed
    #[error("Target directory error: {0}")]
    Target(#[from] TargetError),

    /// Another pass holds the run guard
    #[error("A sync pass is already in progress")]
    PassInProgress,

    /// A configured server has a type with no registered adapter
    #[error("No source adapter registered for server '{server_id}' of type '{source_type}'")]
    MissingAdapter {
        server_id: String,
        source_type: String,
    },
}

/// Invalid or missing configuration for a server or the target directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No server is enabled, so a pass would have nothing to reconcile against
    #[error("No enabled media servers configured")]
    NoEnabledServers,

    /// Two servers share the same id
    #[error("Duplicate server id '{server_id}'")]
    DuplicateServerId { server_id: String },

    /// A required field is empty or absent
    #[error("Missing required field '{field}' for {scope}")]
    MissingField { scope: String, field: String },

    /// A field is present but its value is unusable
    #[error("Invalid value for '{field}' in {scope}: {message}")]
    InvalidField {
        scope: String,
        field: String,
        message: String,
    },

    /// The configuration document could not be read or parsed
    #[error("Failed to load configuration: {message}")]
    Load { message: String },
}

/// Failure to collect users from a single source server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceError {
    /// The server could not be reached or failed its health check
    #[error("Server unreachable: {message}")]
    Unreachable { message: String },

    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The call did not settle within the configured timeout
    #[error("Timed out after {after:?}")]
    Timeout { after: Duration },

    /// The response could not be normalised into user records
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Any other adapter failure
    #[error("{message}")]
    Other { message: String },
}

/// Failure to list the accounts of the target directory. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("Target directory unreachable: {message}")]
    Unreachable { message: String },

    #[error("Target directory returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Target directory listing timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Target directory returned an invalid response: {message}")]
    InvalidResponse { message: String },
}

/// Failure of a single create or delete call against the target directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountOpError {
    #[error("Account '{username}' already exists")]
    AlreadyExists { username: String },

    #[error("Account '{username}' not found")]
    NotFound { username: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("{message}")]
    Other { message: String },
}

impl SyncError {
    /// Create a missing adapter error
    pub fn missing_adapter(server_id: impl Into<String>, source_type: impl ToString) -> Self {
        Self::MissingAdapter {
            server_id: server_id.into(),
            source_type: source_type.to_string(),
        }
    }

    /// Whether the error came from configuration rather than runtime state.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingAdapter { .. })
    }
}

impl ConfigError {
    /// Create a missing field error
    pub fn missing(scope: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            scope: scope.into(),
            field: field.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid(
        scope: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            scope: scope.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create an unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl TargetError {
    /// Create an unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

impl AccountOpError {
    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type SyncResult<T> = Result<T, SyncError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type SourceResult<T> = Result<T, SourceError>;
pub type TargetResult<T> = Result<T, TargetError>;
pub type AccountOpResult<T> = Result<T, AccountOpError>;
