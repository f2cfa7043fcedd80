use thiserror::Error;

use crate::cache::StoreError;
use crate::compensation::CompensationError;
use crate::models::Travel;
use crate::remote::RemoteError;

/// Generic text shown to users for any failure.
pub const USER_FACING_MESSAGE: &str = "Something went wrong, please try again later";

/// The only detail about a failure that crosses into the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A fetch failed; local state is unaffected and retrying is safe.
    TransientRemote,
    /// An update, delete or upload failed; optimistic state must roll back.
    MutationRemote,
    /// The local record store failed.
    LocalStore,
    /// The caller asked for something the current state does not allow.
    InvalidRequest,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("fetch failed: {0}")]
    TransientRemote(#[source] RemoteError),

    #[error("remote mutation failed: {0}")]
    MutationRemote(#[source] RemoteError),

    #[error("local store failed: {0}")]
    LocalStore(#[from] StoreError),

    #[error(transparent)]
    Compensation(#[from] CompensationError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server accepted an update but the cached row could not be brought
    /// in line with it. Carries the server's travel.
    #[error("update applied remotely but the local cache is stale: {source}")]
    AppliedRemotely { travel: Box<Travel>, source: Box<CoreError> },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TransientRemote(_) => ErrorKind::TransientRemote,
            CoreError::MutationRemote(_) => ErrorKind::MutationRemote,
            CoreError::LocalStore(_) | CoreError::AppliedRemotely { .. } => ErrorKind::LocalStore,
            CoreError::Compensation(_) | CoreError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    pub fn user_message(&self) -> &'static str {
        USER_FACING_MESSAGE
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientRemote
    }

    /// The server's copy of a travel whose update went through remotely.
    pub fn applied_travel(&self) -> Option<&Travel> {
        match self {
            CoreError::AppliedRemotely { travel, .. } => Some(&**travel),
            _ => None,
        }
    }
}
