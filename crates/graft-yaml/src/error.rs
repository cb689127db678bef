//! Error types for YAML ingestion and emission.

use thiserror::Error;

/// Result type alias for graft-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// YAML syntax error
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Well-formed YAML that graft cannot use
    #[error("Invalid YAML structure: {message}")]
    InvalidStructure { message: String },

    #[error("Emit error: {0}")]
    Emit(String),
}

impl Error {
    /// Prefix the message with the file it came from.
    pub(crate) fn in_file(self, filename: Option<&str>) -> Self {
        let Some(filename) = filename else {
            return self;
        };
        match self {
            Error::ParseError { message } => Error::ParseError {
                message: format!("{}: {}", filename, message),
            },
            Error::InvalidStructure { message } => Error::InvalidStructure {
                message: format!("{}: {}", filename, message),
            },
            other => other,
        }
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::ParseError {
            message: err.to_string(),
        }
    }
}

impl From<yaml_rust2::EmitError> for Error {
    fn from(err: yaml_rust2::EmitError) -> Self {
        Error::Emit(err.to_string())
    }
}
