//! Service-boundary error taxonomy.
//!
//! # Invariants
//! - Client faults (`Validation`, `Unauthorized`, `NotFound`) are produced
//!   before or instead of any store write and are never retried.
//! - Server faults (`StoreUnavailable`, `Store`) leave no partial writes.

use crate::model::cursor::CursorError;
use crate::model::item::ItemId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input rejected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyBody,
    BodyTooLong { max_chars: usize, actual_chars: usize },
    LimitOutOfRange { limit: u32, min: u32, max: u32 },
    MalformedCursor(CursorError),
    MalformedItemId(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBody => write!(f, "body must not be empty"),
            Self::BodyTooLong {
                max_chars,
                actual_chars,
            } => write!(
                f,
                "body has {actual_chars} characters; at most {max_chars} allowed"
            ),
            Self::LimitOutOfRange { limit, min, max } => {
                write!(f, "limit {limit} is outside {min}..={max}")
            }
            Self::MalformedCursor(err) => write!(f, "malformed cursor: {err}"),
            Self::MalformedItemId(value) => write!(f, "malformed item id: `{value}`"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedCursor(err) => Some(err),
            _ => None,
        }
    }
}

/// Error returned by feed services.
#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    /// Caller identity is missing or not acceptable.
    Unauthorized(&'static str),
    NotFound(ItemId),
    /// Lock contention persisted through every retry.
    StoreUnavailable {
        operation: &'static str,
        attempts: u32,
        source: RepoError,
    },
    Store(RepoError),
}

impl ServiceError {
    /// Returns whether the caller, not the server, caused the failure.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Unauthorized(_) | Self::NotFound(_)
        )
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Unauthorized(reason) => write!(f, "unauthorized: {reason}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::StoreUnavailable {
                operation,
                attempts,
                source,
            } => write!(
                f,
                "store unavailable for {operation} after {attempts} attempt(s): {source}"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StoreUnavailable { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            Self::Unauthorized(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}
