//! Error types for registry, object-storage and model operations

use thiserror::Error;

/// Coarse classification of an [`Error`], stable across wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied missing or inconsistent input
    InvalidArgument,
    /// The request never produced a usable HTTP response
    Transport,
    /// The remote side reports the entity does not exist
    NotFound,
    /// The remote side answered but refused the request
    Rejected,
    /// Local filesystem failure
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::Transport => write!(f, "transport"),
            Self::NotFound => write!(f, "not_found"),
            Self::Rejected => write!(f, "rejected"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// SDK error
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A remote failure caught at a model operation boundary
    #[error("model {operation} failed: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Tag of the innermost cause
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Transport(_) => ErrorKind::Transport,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Rejected { .. } | Self::Decode(_) => ErrorKind::Rejected,
            Self::Io(_) => ErrorKind::Io,
            Self::Operation { source, .. } => source.kind(),
        }
    }

    /// Name of the model operation that failed, if the error crossed one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub(crate) fn in_operation(self, operation: &'static str) -> Self {
        match self {
            // Validation failures surface unwrapped
            Self::InvalidArgument(_) | Self::Operation { .. } => self,
            other => Self::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_operation_wrapping() {
        let err = Error::NotFound("model m-1".to_string()).in_operation("download");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.operation(), Some("download"));
        assert!(err.to_string().contains("download"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_argument_is_not_wrapped() {
        let err = Error::invalid("local_path is empty").in_operation("register");
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.operation(), None);
    }

    #[test]
    fn test_wrapping_is_idempotent() {
        let err = Error::rejected("QuotaExceeded", "too many models")
            .in_operation("register")
            .in_operation("deploy");
        assert_eq!(err.operation(), Some("register"));
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "invalid_argument");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::Rejected.to_string(), "rejected");
    }
}
