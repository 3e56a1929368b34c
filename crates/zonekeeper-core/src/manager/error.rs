//! Outcomes of rejected or failed lifecycle operations

use thiserror::Error;

use crate::traits::remote_zone::RemoteError;
use crate::validate::ValidationError;

/// Error returned by [`super::RecordManager`] operations
///
/// Store and transport failures are flattened into messages; nothing
/// implementation-specific crosses this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    #[error("record quota exceeded ({current} of {limit} records in use)")]
    QuotaExceeded { current: usize, limit: u32 },

    #[error("name '{full_name}' is already taken")]
    NameConflict { full_name: String },

    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("record {record_id} does not belong to {owner_id}")]
    OwnershipViolation { record_id: String, owner_id: String },

    #[error("record {record_id} not found")]
    NotFound { record_id: String },

    #[error("unknown owner {owner_id}")]
    UnknownOwner { owner_id: String },

    #[error("owner {owner_id} is suspended")]
    OwnerSuspended { owner_id: String },

    #[error("remote create failed: {0}")]
    RemoteCreateFailed(RemoteError),

    #[error("remote update failed: {0}")]
    RemoteUpdateFailed(RemoteError),

    #[error("remote delete failed: {0}")]
    RemoteDeleteFailed(RemoteError),

    /// Local and remote state disagree and automatic compensation failed
    #[error("local and remote state diverged for '{full_name}' (remote id {remote_id}): {detail}")]
    ReconciliationInconsistency {
        full_name: String,
        remote_id: String,
        detail: String,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    /// The remote failure behind this error, if any
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            Self::RemoteCreateFailed(err)
            | Self::RemoteUpdateFailed(err)
            | Self::RemoteDeleteFailed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether retrying later may succeed (remote transient or rate limited)
    pub fn is_retryable(&self) -> bool {
        self.remote_error().is_some_and(RemoteError::is_retryable)
    }

    /// Whether the caller can fix the request (as opposed to an outage)
    pub fn is_user_correctable(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. }
            | Self::NameConflict { .. }
            | Self::InvalidInput(_)
            | Self::OwnershipViolation { .. }
            | Self::NotFound { .. }
            | Self::UnknownOwner { .. }
            | Self::OwnerSuspended { .. } => true,
            Self::RemoteCreateFailed(err)
            | Self::RemoteUpdateFailed(err)
            | Self::RemoteDeleteFailed(err) => {
                err.class == crate::traits::RemoteErrorClass::ValidationRejected
            }
            Self::ReconciliationInconsistency { .. } | Self::Store(_) | Self::Internal(_) => false,
        }
    }
}

impl From<crate::Error> for ManagerError {
    fn from(err: crate::Error) -> Self {
        Self::Store(err.to_string())
    }
}
