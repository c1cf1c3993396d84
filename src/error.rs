//! Error types for the intent router.
//!
//! All fallible operations return [`RouterError`] through the crate-wide
//! [`Result`] alias. Gate rejections and missing handlers are *not* errors:
//! they always produce a valid [`RouteResult`](crate::router::RouteResult)
//! routed to the fallback.
//!
//! # Examples
//!
//! ```
//! use intent_router::error::{Result, RouterError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(RouterError::invalid_argument("empty intent name"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for router operations.
#[derive(Error, Debug)]
pub enum RouterError {
    /// I/O errors (artifact files, configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `train()` was called with no registered examples.
    #[error("No training examples registered")]
    NoTrainingExamples,

    /// The corpus covers fewer than two distinct intents.
    #[error("Training requires at least two intents, found {0}")]
    InsufficientClasses(usize),

    /// `route()` reached the statistical model before any `train()`/`load()`.
    #[error("Model not trained or loaded")]
    NotTrained,

    /// `save()` was called before any model existed.
    #[error("Nothing to save: no model has been trained")]
    NothingToSave,

    /// A rule pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Analysis-related errors (tokenization, filtering).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Model fitting or inference errors.
    #[error("Model error: {0}")]
    Model(String),

    /// Binary encoding/decoding of an artifact failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An artifact was readable but structurally invalid.
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with RouterError.
pub type Result<T> = std::result::Result<T, RouterError>;

impl RouterError {
    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        RouterError::Analysis(msg.into())
    }

    /// Create a new model error.
    pub fn model<S: Into<String>>(msg: S) -> Self {
        RouterError::Model(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        RouterError::Serialization(msg.into())
    }

    /// Create a new corrupt artifact error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        RouterError::CorruptArtifact(msg.into())
    }

    /// Create a new invalid pattern error.
    pub fn invalid_pattern<P: Into<String>, M: Into<String>>(pattern: P, message: M) -> Self {
        RouterError::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RouterError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        RouterError::Other(format!("Invalid configuration: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RouterError::Other(msg.into())
    }

    /// Whether this error is a lifecycle precondition violation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            RouterError::NoTrainingExamples
                | RouterError::InsufficientClasses(_)
                | RouterError::NotTrained
                | RouterError::NothingToSave
        )
    }
}

impl From<bincode::Error> for RouterError {
    fn from(err: bincode::Error) -> Self {
        RouterError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = RouterError::analysis("bad token");
        assert_eq!(error.to_string(), "Analysis error: bad token");

        let error = RouterError::invalid_pattern("(", "unclosed group");
        assert_eq!(error.to_string(), "Invalid pattern '(': unclosed group");

        let error = RouterError::invalid_argument("empty name");
        assert_eq!(error.to_string(), "Error: Invalid argument: empty name");
    }

    #[test]
    fn test_precondition_classification() {
        assert!(RouterError::NotTrained.is_precondition());
        assert!(RouterError::NothingToSave.is_precondition());
        assert!(RouterError::InsufficientClasses(1).is_precondition());
        assert!(!RouterError::corrupt("bad magic").is_precondition());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let router_error = RouterError::from(io_error);

        match router_error {
            RouterError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
