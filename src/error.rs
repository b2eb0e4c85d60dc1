//! Error types for the CSS variable inliner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InlinerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse { line: usize, column: usize, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid reference pattern: {message}")]
    Pattern { message: String },
}

pub type Result<T> = std::result::Result<T, InlinerError>;

impl InlinerError {
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = InlinerError::parse(3, 7, "Unclosed block");
        assert_eq!(err.to_string(), "Parse error at line 3, column 7: Unclosed block");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: InlinerError = io.into();
        assert!(matches!(err, InlinerError::Io(_)));
    }
}
