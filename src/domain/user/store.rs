//! User store trait

use async_trait::async_trait;
use thiserror::Error;

use super::entity::{NewUser, User, UserId};

#[cfg(test)]
use mockall::automock;

/// Errors reported by a [`UserStore`] implementation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Backend failure: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Durable storage for user records, keyed by [`UserId`].
///
/// Implementations must be safe to share between concurrent callers and are
/// responsible for serializing conflicting writes to the same record.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user and return it with its assigned id.
    ///
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Fetch a user, failing with [`StoreError::NotFound`] when absent
    async fn get_user_by_id(&self, id: UserId) -> Result<User, StoreError>;

    /// Write back the complete record of an existing user
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
}
