//! Error types for the sync system
//!
//! [`Error`] covers failures that abort a run (or a single collaborator call).
//! [`ReconcileError`] covers per-item failures that are collected during
//! reconciliation and never abort it.

use thiserror::Error;

use crate::model::PrefixId;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Service provider (cluster enumeration) errors
    #[error("Service provider error: {0}")]
    ServiceProvider(String),

    /// Registry (IPAM) errors
    #[error("Registry error: {0}")]
    Registry(String),

    /// State store errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// DNS resolution errors
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend-specific error
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a service provider error
    pub fn service_provider(msg: impl Into<String>) -> Self {
        Self::ServiceProvider(msg.into())
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a backend-specific error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the target object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// A per-item failure collected during reconciliation
///
/// None of these abort a run. They are reported alongside the final record
/// set, which is still persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A DNS-named service could not be resolved; no records were requested
    #[error("failed to resolve {address}: {cause}")]
    AddressResolutionFailed { address: String, cause: String },

    /// A registry create call failed for a service
    ///
    /// Records created earlier in the same expansion are kept.
    #[error("failed to create prefix for {address}: {cause}")]
    RegistryCreateFailed { address: String, cause: String },

    /// A registry delete call failed; the record stays in the persisted set
    #[error("failed to delete prefix {prefix_id}: {cause}")]
    RegistryDeleteFailed { prefix_id: PrefixId, cause: String },
}

impl ReconcileError {
    /// The join key or prefix id this failure refers to, for logging
    pub fn subject(&self) -> String {
        match self {
            Self::AddressResolutionFailed { address, .. }
            | Self::RegistryCreateFailed { address, .. } => address.clone(),
            Self::RegistryDeleteFailed { prefix_id, .. } => prefix_id.to_string(),
        }
    }
}
