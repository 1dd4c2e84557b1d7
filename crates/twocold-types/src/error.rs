//! Error types for value parsing and validation in twocold-types.

use thiserror::Error;

/// Errors that can occur when parsing or validating boundary values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The floor number is not one of the supported locations.
    #[error("Unexpected floor '{0}'")]
    UnknownFloor(String),

    /// The device identifier is not a non-negative integer.
    #[error("Unexpected device id '{0}'")]
    InvalidDeviceId(String),

    /// An edit payload field failed validation.
    #[error("{0}")]
    InvalidEdit(String),
}

/// Result type alias using twocold-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
