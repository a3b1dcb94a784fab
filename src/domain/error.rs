use thiserror::Error;

use super::user::StoreError;

/// Broad category of a [`DomainError`], for callers that branch on failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Entropy,
    Hashing,
    Authentication,
    NotFound,
    Store,
    Configuration,
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Entropy error: {message}")]
    Entropy { message: String },

    #[error("Hashing error: {message}")]
    Hashing { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn entropy(message: impl Into<String>) -> Self {
        Self::Entropy {
            message: message.into(),
        }
    }

    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Entropy { .. } => ErrorKind::Entropy,
            Self::Hashing { .. } => ErrorKind::Hashing,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Store,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { message } => Self::NotFound { message },
            other => Self::Store(other),
        }
    }
}
