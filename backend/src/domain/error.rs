//! Domain-level error type.
//!
//! Services translate port failures into [`Error`]; inbound adapters decide
//! how each [`ErrorCode`] is rendered. The message of an
//! [`ErrorCode::InternalError`] is diagnostic detail and must never reach a
//! client verbatim.

use std::fmt;

/// Stable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Client input failed validation.
    InvalidRequest,
    /// The caller is not recognised.
    Unauthorized,
    /// The request collides with existing state.
    Conflict,
    /// A dependency failed or an invariant was broken.
    InternalError,
}

/// Domain error carrying a category and a message.
///
/// # Examples
/// ```
/// use users_service::domain::{Error, ErrorCode};
///
/// let err = Error::conflict("username already exists");
/// assert_eq!(err.code(), ErrorCode::Conflict);
/// assert_eq!(err.message(), "username already exists");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    /// Build an error from its parts.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure category.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message attached at construction.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
    #[case::unauthorized(Error::unauthorized("who"), ErrorCode::Unauthorized)]
    #[case::conflict(Error::conflict("taken"), ErrorCode::Conflict)]
    #[case::internal(Error::internal("boom"), ErrorCode::InternalError)]
    fn constructors_set_the_matching_code(#[case] err: Error, #[case] expected: ErrorCode) {
        assert_eq!(err.code(), expected);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = Error::internal("pool exhausted");
        assert_eq!(err.to_string(), "InternalError: pool exhausted");
    }
}
