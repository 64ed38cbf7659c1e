//! Error types for ledger operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::model::{EventId, UserId};

/// Errors produced by the reconciliation engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No identity could be resolved for the caller.
    #[error("authentication required")]
    Unauthenticated,
    /// Identity resolved but lacks the required capability.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Event does not exist.
    #[error("event not found: {0}")]
    EventNotFound(EventId),
    /// Referenced user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    /// A charge would be applied to a user without credit.
    #[error("insufficient balance for user {user_id}: {balance}")]
    InsufficientBalance {
        /// User that would be charged.
        user_id: UserId,
        /// Balance observed at check time.
        balance: i64,
    },
    /// User is already in the attendee list.
    #[error("user {0} is already enrolled")]
    AlreadyEnrolled(UserId),
    /// User is not in the attendee list.
    #[error("user {0} is not enrolled")]
    NotEnrolled(UserId),
    /// The event changed underneath the operation.
    #[error("conflicting update on event {0}")]
    ConflictingUpdate(EventId),
    /// An enrollment policy rejected the operation.
    #[error("policy violation: {0}")]
    PolicyViolation(String),
    /// Payload failed boundary validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Operation deadline passed before commit.
    #[error("deadline expired")]
    DeadlineExpired,
    /// Backend-specific failure with context.
    #[error("store failure: {0}")]
    Store(String),
}

/// Wire-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`LedgerError::Unauthenticated`].
    Unauthenticated,
    /// See [`LedgerError::Forbidden`].
    Forbidden,
    /// Event or referenced user absent.
    NotFound,
    /// See [`LedgerError::InsufficientBalance`].
    InsufficientBalance,
    /// See [`LedgerError::AlreadyEnrolled`].
    AlreadyEnrolled,
    /// See [`LedgerError::NotEnrolled`].
    NotEnrolled,
    /// See [`LedgerError::ConflictingUpdate`].
    ConflictingUpdate,
    /// See [`LedgerError::PolicyViolation`].
    PolicyViolation,
    /// See [`LedgerError::InvalidRequest`].
    InvalidRequest,
    /// See [`LedgerError::DeadlineExpired`].
    Timeout,
    /// See [`LedgerError::Store`].
    StoreFailure,
}

impl ErrorKind {
    /// HTTP-style status code for transports that need one.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InsufficientBalance
            | Self::AlreadyEnrolled
            | Self::NotEnrolled
            | Self::ConflictingUpdate => 409,
            Self::PolicyViolation => 422,
            Self::StoreFailure => 500,
            Self::Timeout => 504,
        }
    }
}

impl LedgerError {
    /// Classification of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::EventNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::AlreadyEnrolled(_) => ErrorKind::AlreadyEnrolled,
            Self::NotEnrolled(_) => ErrorKind::NotEnrolled,
            Self::ConflictingUpdate(_) => ErrorKind::ConflictingUpdate,
            Self::PolicyViolation(_) => ErrorKind::PolicyViolation,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::DeadlineExpired => ErrorKind::Timeout,
            Self::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

/// Result alias for domain operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
