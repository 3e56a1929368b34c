//! Error types for zonekeeper
//!
//! [`Error`] covers infrastructure failures (stores, configuration,
//! providers). Outcomes of lifecycle operations are reported through
//! [`crate::manager::ManagerError`], which wraps this type where needed.

use thiserror::Error;

/// Result type alias for zonekeeper infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stores, configuration and providers
#[derive(Error, Debug)]
pub enum Error {
    /// Record store errors
    #[error("Record store error: {0}")]
    RecordStore(String),

    /// Account directory errors
    #[error("Account directory error: {0}")]
    AccountStore(String),

    /// Settings store errors
    #[error("Settings store error: {0}")]
    SettingsStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A uniqueness constraint or version check was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a record store error
    pub fn record_store(msg: impl Into<String>) -> Self {
        Self::RecordStore(msg.into())
    }

    /// Create an account directory error
    pub fn account_store(msg: impl Into<String>) -> Self {
        Self::AccountStore(msg.into())
    }

    /// Create a settings store error
    pub fn settings_store(msg: impl Into<String>) -> Self {
        Self::SettingsStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports a violated uniqueness or version constraint
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
