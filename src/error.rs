//! Error types for background removal operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error taxonomy shared by the parser, the removal call, the tiled pipeline
/// and the batch runner
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Invalid numeric text supplied for a named field
    #[error("{message}")]
    Parse {
        /// Human-readable field title (e.g. "Discard threshold", "Shifts")
        field: String,
        /// Localized, field-specific message
        message: String,
    },

    /// Missing or unusable input image
    #[error("{0}")]
    Input(String),

    /// Model identifier outside the supported set
    #[error("Unknown model identifier: {0}")]
    ModelIdentifier(String),

    /// Failure raised by the segmentation or matting collaborator
    #[error("Computation error: {0}")]
    Computation(String),

    /// Session loading failure
    #[error("Model error: {0}")]
    Model(String),

    /// Directory collision, unreadable source or unwritable output
    #[error("Failed to {operation} '{}': {source}", path.display())]
    Filesystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Broken internal invariant (e.g. a tile worker panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgRemovalError {
    /// Create a new field-tagged parse error
    pub fn parse<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Parse {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new input error
    pub fn input<S: Into<String>>(msg: S) -> Self {
        Self::Input(msg.into())
    }

    /// Create a new computation error, keeping the collaborator's message as is
    pub fn computation<S: Into<String>>(msg: S) -> Self {
        Self::Computation(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a filesystem error with operation context
    pub fn filesystem<P: Into<PathBuf>>(operation: &str, path: P, source: std::io::Error) -> Self {
        Self::Filesystem {
            operation: operation.to_string(),
            path: path.into(),
            source,
        }
    }

    /// Field name for parse errors, `None` for every other kind
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Parse { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Configuration value error with the valid range spelled out
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = BgRemovalError::parse("Epsilon", "Epsilon must be a number");
        assert!(matches!(err, BgRemovalError::Parse { .. }));
        assert_eq!(err.field(), Some("Epsilon"));

        let err = BgRemovalError::computation("solver diverged");
        assert!(matches!(err, BgRemovalError::Computation(_)));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_error_display() {
        let err = BgRemovalError::input("no image provided");
        assert_eq!(err.to_string(), "no image provided");

        let err = BgRemovalError::parse("Shifts", "Shifts must be comma separated numbers");
        assert_eq!(err.to_string(), "Shifts must be comma separated numbers");

        let err = BgRemovalError::computation("cholesky failed");
        assert_eq!(err.to_string(), "Computation error: cholesky failed");
    }

    #[test]
    fn test_filesystem_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists");
        let err = BgRemovalError::filesystem(
            "create destination directory",
            Path::new("/tmp/results/20240101120000"),
            io_error,
        );
        let error_string = err.to_string();
        assert!(error_string.contains("create destination directory"));
        assert!(error_string.contains("20240101120000"));
        assert!(error_string.contains("exists"));
    }

    #[test]
    fn test_config_value_error() {
        let err = BgRemovalError::config_value_error("epsilon", -1.0, "> 0");
        let error_string = err.to_string();
        assert!(error_string.contains("epsilon"));
        assert!(error_string.contains("-1"));
        assert!(error_string.contains("> 0"));
    }
}
