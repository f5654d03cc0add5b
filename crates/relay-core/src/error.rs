//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Identifier was empty or whitespace only
    #[error("{field} must not be empty")]
    EmptyIdentifier { field: String },

    /// Identifier exceeded the accepted length
    #[error("{field} is too long: {len} bytes (max: {max})")]
    IdentifierTooLong {
        field: String,
        len: usize,
        max: usize,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
