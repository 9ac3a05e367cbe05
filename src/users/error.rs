use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the identity store and the creation service. Nothing
/// is retried or swallowed at this layer; callers decide what is recoverable.
#[derive(Debug, Error)]
pub enum UserError {
    /// The requested email is already registered.
    #[error("email already registered")]
    DuplicateEmail,

    /// The store accepted the write but the row could not be read back.
    #[error("user {0} was saved but could not be read back")]
    CreationVerificationFailed(Uuid),

    /// The password hashing primitive failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Any other persistence failure, propagated unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl UserError {
    pub fn is_duplicate_email(&self) -> bool {
        matches!(self, UserError::DuplicateEmail)
    }
}
