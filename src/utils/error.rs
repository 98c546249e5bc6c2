use std::fmt;

use thiserror::Error;

pub const ACCESS_DENIED: &str = "AccessDeniedException";
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
pub const THROTTLING: &str = "ThrottlingException";
pub const FILE_DOES_NOT_EXIST: &str = "FileDoesNotExistException";
pub const FOLDER_DOES_NOT_EXIST: &str = "FolderDoesNotExistException";

#[derive(Error, Debug)]
pub enum GitServiceError {
    #[error("AWS CodeCommit authentication error: {0}")]
    Authentication(String),

    #[error("AWS CodeCommit resource not found: {0}")]
    ResourceNotFound(String),

    #[error("AWS CodeCommit rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("AWS CodeCommit error: {0}")]
    Unknown(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitServiceError>;

/// Error reported by a [`CodeCommitApi`](crate::domain::ports::CodeCommitApi)
/// call, carrying the provider's machine-readable code when it sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn without_code(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authentication,
    NotFound,
    RateLimit,
    Unknown,
}

// STS reports `AccessDenied` and `Throttling` without the `Exception` suffix.
const ERROR_CLASSES: &[(&str, ErrorClass)] = &[
    (ACCESS_DENIED, ErrorClass::Authentication),
    ("AccessDenied", ErrorClass::Authentication),
    ("UnrecognizedClientException", ErrorClass::Authentication),
    ("ExpiredTokenException", ErrorClass::Authentication),
    (RESOURCE_NOT_FOUND, ErrorClass::NotFound),
    (THROTTLING, ErrorClass::RateLimit),
    ("Throttling", ErrorClass::RateLimit),
];

pub fn classify(code: &str) -> ErrorClass {
    ERROR_CLASSES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, class)| *class)
        .unwrap_or(ErrorClass::Unknown)
}

impl From<ProviderError> for GitServiceError {
    fn from(err: ProviderError) -> Self {
        let class = err
            .code
            .as_deref()
            .map(classify)
            .unwrap_or(ErrorClass::Unknown);
        let message = err.to_string();
        match class {
            ErrorClass::Authentication => GitServiceError::Authentication(message),
            ErrorClass::NotFound => GitServiceError::ResourceNotFound(message),
            ErrorClass::RateLimit => GitServiceError::RateLimit(message),
            ErrorClass::Unknown => GitServiceError::Unknown(message),
        }
    }
}

impl GitServiceError {
    /// Process exit code used by the CLI for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GitServiceError::Authentication(_) => 3,
            GitServiceError::ResourceNotFound(_) => 4,
            GitServiceError::RateLimit(_) => 5,
            GitServiceError::ConfigError { .. }
            | GitServiceError::InvalidConfigValueError { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        assert_eq!(classify("AccessDeniedException"), ErrorClass::Authentication);
        assert_eq!(classify("AccessDenied"), ErrorClass::Authentication);
        assert_eq!(classify("ResourceNotFoundException"), ErrorClass::NotFound);
        assert_eq!(classify("ThrottlingException"), ErrorClass::RateLimit);
    }

    #[test]
    fn test_classify_falls_back_to_unknown() {
        assert_eq!(classify("RepositoryDoesNotExistException"), ErrorClass::Unknown);
        assert_eq!(classify("FileDoesNotExistException"), ErrorClass::Unknown);
        assert_eq!(classify(""), ErrorClass::Unknown);
        // Codes are case-sensitive.
        assert_eq!(classify("accessdeniedexception"), ErrorClass::Unknown);
    }

    #[test]
    fn test_provider_error_conversion_keeps_message() {
        let err: GitServiceError =
            ProviderError::new(THROTTLING, "Rate exceeded").into();
        match err {
            GitServiceError::RateLimit(message) => {
                assert!(message.contains("Rate exceeded"));
                assert!(message.contains("ThrottlingException"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err: GitServiceError = ProviderError::without_code("connection reset").into();
        assert!(matches!(err, GitServiceError::Unknown(ref m) if m == "connection reset"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(GitServiceError::Authentication("x".into()).exit_code(), 3);
        assert_eq!(GitServiceError::ResourceNotFound("x".into()).exit_code(), 4);
        assert_eq!(GitServiceError::RateLimit("x".into()).exit_code(), 5);
        assert_eq!(GitServiceError::Unknown("x".into()).exit_code(), 1);
    }
}
