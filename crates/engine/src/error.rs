//! The module contains the errors the engine can return.
//!
//! Every operation returns a typed [`EngineError`]; callers surface them to
//! the end user unchanged. Only [`StoreUnavailable`] is transient and safe to
//! retry (appends are deduplicated by idempotency key).
//!
//! [`StoreUnavailable`]: EngineError::StoreUnavailable
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Not a member: {0}")]
    NotAMember(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already a member: {0}")]
    AlreadyMember(String),
    #[error("Owner required: {0}")]
    OwnerRequired(String),
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    StoreUnavailable(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the caller may retry the operation with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::NotAMember(a), Self::NotAMember(b)) => a == b,
            (Self::NotAuthorized(a), Self::NotAuthorized(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::AlreadyMember(a), Self::AlreadyMember(b)) => a == b,
            (Self::OwnerRequired(a), Self::OwnerRequired(b)) => a == b,
            (Self::InvalidPeriod(a), Self::InvalidPeriod(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => {
                a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}
