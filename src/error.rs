use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by quiz and manifest operations.
#[derive(Debug, Error)]
pub enum MkquizError {
    #[error("{0}")]
    Config(String),

    #[error("Configuration not found at {}. Run `mkquiz config` first.", .0.display())]
    ConfigMissing(PathBuf),

    #[error("{message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{message}")]
    Json {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Template {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    QuizOperation {
        message: String,
        quiz: Option<String>,
    },

    #[error("question extraction failed: {0}")]
    Extraction(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MkquizError>;

impl MkquizError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn fs(message: impl Into<String>, path: &Path) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.to_path_buf()),
        }
    }

    pub fn validation(message: impl Into<String>, field: &str) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn json(message: impl Into<String>, path: Option<&Path>) -> Self {
        Self::Json {
            message: message.into(),
            path: path.map(Path::to_path_buf),
        }
    }

    pub fn template(message: impl Into<String>, path: &Path) -> Self {
        Self::Template {
            message: message.into(),
            path: Some(path.to_path_buf()),
        }
    }

    pub fn quiz(message: impl Into<String>, quiz: &str) -> Self {
        Self::QuizOperation {
            message: message.into(),
            quiz: Some(quiz.to_string()),
        }
    }

    /// Machine-readable kind, used as the `type` of HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::ConfigMissing(_) => "ConfigError",
            Self::FileSystem { .. } => "FileSystemError",
            Self::Validation { .. } => "ValidationError",
            Self::Json { .. } => "JsonError",
            Self::Template { .. } => "TemplateError",
            Self::QuizOperation { .. } => "QuizOperationError",
            Self::Extraction(_) => "ExtractionError",
            Self::Internal(_) => "InternalError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_one_line() {
        let err = MkquizError::fs(
            "Failed to copy question file: permission denied",
            Path::new("/tmp/x.json"),
        );
        assert_eq!(err.to_string(), "Failed to copy question file: permission denied");
        assert_eq!(err.kind(), "FileSystemError");

        let err = MkquizError::Extraction("no candidates in response".into());
        assert_eq!(err.to_string(), "question extraction failed: no candidates in response");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(MkquizError::config("x").kind(), "ConfigError");
        assert_eq!(MkquizError::ConfigMissing(".mkquizrc".into()).kind(), "ConfigError");
        assert_eq!(MkquizError::validation("x", "id").kind(), "ValidationError");
        assert_eq!(MkquizError::json("x", None).kind(), "JsonError");
        assert_eq!(MkquizError::template("x", Path::new("t.html")).kind(), "TemplateError");
        assert_eq!(MkquizError::quiz("x", "Algo").kind(), "QuizOperationError");
        assert_eq!(MkquizError::Internal("x".into()).kind(), "InternalError");
    }
}
