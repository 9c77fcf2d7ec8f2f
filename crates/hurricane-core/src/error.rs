//! Unified error types for the hurricane pipeline
//!
//! [`HurricaneError`] carries the failure taxonomy shared by every stage:
//! configuration problems, missing artifacts, same-day rebuild conflicts,
//! field coercion failures and integrity violations. Stage runners wrap it in
//! `anyhow::Error` and callers can recover the variant with `downcast_ref`.
//!
//! # Example
//!
//! ```ignore
//! use hurricane_core::{HurricaneError, HurricaneResult};
//!
//! fn require_places(places: &[String]) -> HurricaneResult<()> {
//!     if places.is_empty() {
//!         return Err(HurricaneError::Validation("no place identifiers".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all hurricane operations.
#[derive(Error, Debug)]
pub enum HurricaneError {
    /// I/O errors (file access, rename, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing or empty required configuration
    #[error("Validation error: {0}")]
    Validation(String),

    /// Expected persisted artifact is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rebuild attempted twice on the same calendar date
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A field could not be coerced to its declared type
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Invariant violation that signals a defect (e.g. duplicate natural key)
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Storage collaborator failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl HurricaneError {
    /// Whether this error is a missing-artifact signal that callers may treat
    /// as an empty collection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HurricaneError::NotFound(_))
    }
}

/// Convenience type alias for Results using HurricaneError.
pub type HurricaneResult<T> = Result<T, HurricaneError>;

impl From<anyhow::Error> for HurricaneError {
    fn from(err: anyhow::Error) -> Self {
        HurricaneError::Other(err.to_string())
    }
}

impl From<String> for HurricaneError {
    fn from(s: String) -> Self {
        HurricaneError::Other(s)
    }
}

impl From<&str> for HurricaneError {
    fn from(s: &str) -> Self {
        HurricaneError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for HurricaneError {
    fn from(err: serde_json::Error) -> Self {
        HurricaneError::Parse(err.to_string())
    }
}

impl From<chrono::ParseError> for HurricaneError {
    fn from(err: chrono::ParseError) -> Self {
        HurricaneError::Conversion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HurricaneError::Conflict("rebuild already ran on 2024-03-01".into());
        assert!(err.to_string().contains("Conflict"));
        assert!(err.to_string().contains("2024-03-01"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HurricaneError = io_err.into();
        assert!(matches!(err, HurricaneError::Io(_)));
    }

    #[test]
    fn test_chrono_error_is_conversion() {
        let parse = chrono::NaiveDate::parse_from_str("31/31/2020", "%Y-%m-%d").unwrap_err();
        let err: HurricaneError = parse.into();
        assert!(matches!(err, HurricaneError::Conversion(_)));
    }

    #[test]
    fn test_not_found_flag() {
        assert!(HurricaneError::NotFound("vertex.arrow".into()).is_not_found());
        assert!(!HurricaneError::Validation("places".into()).is_not_found());
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> HurricaneResult<()> {
            Err(HurricaneError::Integrity("duplicate key".into()))
        }

        fn outer() -> HurricaneResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(HurricaneError::Integrity(_))));
    }
}
