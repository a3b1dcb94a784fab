//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_user_id, UserValidationError};

/// User identifier - positive integer assigned by the store on creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Create a new UserId after validation
    pub fn new(id: i64) -> Result<Self, UserValidationError> {
        validate_user_id(id)?;
        Ok(Self(id))
    }

    /// Get the inner integer value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = UserValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output of one hashing event: the slow hash and the salt it was computed with.
///
/// The two are only ever replaced together, so a stored hash always matches
/// its salt.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: Vec<u8>,
    salt: String,
}

impl HashedPassword {
    pub fn new(hash: impl Into<Vec<u8>>, salt: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            salt: salt.into(),
        }
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

/// A user that has not been persisted yet and therefore has no id
#[derive(Debug, Clone)]
pub struct NewUser {
    username: String,
    email: String,
    credential: HashedPassword,
    admin: bool,
    admin_forced_password_reset: bool,
    created_at: DateTime<Utc>,
}

impl NewUser {
    /// Create a new, enabled user record
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        credential: HashedPassword,
        admin: bool,
        admin_forced_password_reset: bool,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            credential,
            admin,
            admin_forced_password_reset,
            created_at: Utc::now(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn credential(&self) -> &HashedPassword {
        &self.credential
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn admin_forced_password_reset(&self) -> bool {
        self.admin_forced_password_reset
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Attach the id assigned by the store
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            credential: self.credential,
            admin: self.admin,
            admin_forced_password_reset: self.admin_forced_password_reset,
            enabled: true,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique identifier for the user
    id: UserId,
    /// Username for login
    username: String,
    email: String,
    /// Password hash and salt - never exposed in serialization
    #[serde(skip_serializing)]
    credential: HashedPassword,
    admin: bool,
    admin_forced_password_reset: bool,
    enabled: bool,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl User {
    /// Rebuild a user from its stored fields
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        credential: HashedPassword,
        admin: bool,
        admin_forced_password_reset: bool,
        enabled: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            credential,
            admin,
            admin_forced_password_reset,
            enabled,
            created_at,
            updated_at,
        }
    }

    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn credential(&self) -> &HashedPassword {
        &self.credential
    }

    pub fn password_hash(&self) -> &[u8] {
        self.credential.hash()
    }

    pub fn salt(&self) -> &str {
        self.credential.salt()
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn admin_forced_password_reset(&self) -> bool {
        self.admin_forced_password_reset
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Mutators

    /// Replace the password hash together with its salt
    pub fn set_password(&mut self, credential: HashedPassword) {
        self.credential = credential;
        self.touch();
    }

    pub fn set_admin(&mut self, admin: bool) {
        self.admin = admin;
        self.touch();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
