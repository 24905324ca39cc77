//! # DomainError
//!
//! Centralized error type for every port and service in agora.
//! Adapters translate their own failures into one of these variants;
//! the HTTP layer maps each variant onto a status code.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Referenced resource is absent (post, comment, profile, vote record).
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Malformed input (unparsable id, empty required field).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource already exists (e.g. duplicate document id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying document store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A single store call exceeded its fixed deadline.
    #[error("store operation timed out: {0}")]
    Timeout(String),
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound(kind, id.to_string())
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("document codec: {err}"))
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
