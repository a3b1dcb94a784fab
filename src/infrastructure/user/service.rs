//! User service for account lifecycle and credential management

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::StatusUpdatePolicy;
use crate::domain::user::{
    validate_email, validate_password, validate_username, NewUser, User, UserId, UserStore,
    UserValidationError,
};
use crate::domain::DomainError;

use super::password::PasswordHasher;

const CURRENT_PASSWORD_FAILED: &str = "current password validation failed";

/// Request for creating a new user, as decoded by the transport
#[derive(Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub admin: Option<bool>,
    pub admin_forced_password_reset: Option<bool>,
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("admin", &self.admin)
            .field("admin_forced_password_reset", &self.admin_forced_password_reset)
            .finish()
    }
}

impl CreateUserRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
            admin: None,
            admin_forced_password_reset: None,
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn with_forced_password_reset(mut self, forced: bool) -> Self {
        self.admin_forced_password_reset = Some(forced);
        self
    }
}

/// User service for account lifecycle and credential management
#[derive(Debug)]
pub struct UserService<S: UserStore + ?Sized, H: PasswordHasher + ?Sized> {
    store: Arc<S>,
    hasher: Arc<H>,
    status_update_policy: StatusUpdatePolicy,
}

impl<S: UserStore + ?Sized, H: PasswordHasher + ?Sized> UserService<S, H> {
    /// Create a new user service
    pub fn new(store: Arc<S>, hasher: Arc<H>) -> Self {
        Self {
            store,
            hasher,
            status_update_policy: StatusUpdatePolicy::default(),
        }
    }

    pub fn with_status_update_policy(mut self, policy: StatusUpdatePolicy) -> Self {
        self.status_update_policy = policy;
        self
    }

    /// Create a new, enabled user
    #[instrument(skip_all, fields(username = request.username.as_deref()))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        let username = require(request.username, "username")?;
        let email = require(request.email, "email")?;
        let password = require(request.password, "password")?;

        validate_username(&username).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_email(&email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&password).map_err(|e| DomainError::validation(e.to_string()))?;

        let credential = self.hasher.hash(&password)?;

        let user = NewUser::new(
            username,
            email,
            credential,
            request.admin.unwrap_or(false),
            request.admin_forced_password_reset.unwrap_or(false),
        );

        let user = self.store.create_user(user).await?;
        info!(user_id = %user.id(), admin = user.is_admin(), "User created");

        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        debug!(user_id = %id, "Fetching user");
        Ok(self.store.get_user_by_id(id).await?)
    }

    /// Replace a user's password after checking the current one.
    ///
    /// Any failure to establish the current credential, including an unknown
    /// user, surfaces as the same authentication error.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let mut user = match self.get_user(id).await {
            Ok(user) => user,
            Err(DomainError::NotFound { .. }) => {
                warn!(user_id = %id, "Password change rejected: unknown user");
                return Err(DomainError::authentication(CURRENT_PASSWORD_FAILED));
            }
            Err(e) => return Err(e),
        };

        self.check_password(&user, old_password)?;

        validate_password(new_password).map_err(|e| DomainError::validation(e.to_string()))?;

        let credential = self.hasher.hash(new_password)?;
        user.set_password(credential);

        self.save_user(&user).await?;
        info!(user_id = %id, "Password changed");

        Ok(())
    }

    /// Grant or revoke the administrative flag
    #[instrument(skip(self))]
    pub async fn update_admin_role(&self, id: UserId, is_admin: bool) -> Result<(), DomainError> {
        let mut user = self.get_user(id).await?;
        user.set_admin(is_admin);

        self.save_user(&user).await?;
        info!(user_id = %id, admin = is_admin, "Admin role updated");

        Ok(())
    }

    /// Enable or disable a user.
    ///
    /// Under [`StatusUpdatePolicy::RequirePassword`] the user's own password
    /// must be supplied and verify before anything changes.
    #[instrument(skip(self, password))]
    pub async fn update_user_status(
        &self,
        id: UserId,
        password: Option<&str>,
        enabled: bool,
    ) -> Result<(), DomainError> {
        let mut user = self.get_user(id).await?;

        if self.status_update_policy == StatusUpdatePolicy::RequirePassword {
            let Some(password) = password else {
                warn!(user_id = %id, "Status change rejected: no password supplied");
                return Err(DomainError::authentication(CURRENT_PASSWORD_FAILED));
            };
            self.check_password(&user, password)?;
        }

        user.set_enabled(enabled);

        self.save_user(&user).await?;
        info!(user_id = %id, enabled, "User status updated");

        Ok(())
    }

    /// Verify a plaintext against the user's stored credential, collapsing
    /// every failure into one authentication error.
    fn check_password(&self, user: &User, plaintext: &str) -> Result<(), DomainError> {
        match self
            .hasher
            .verify(plaintext, user.salt(), user.password_hash())
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(user_id = %user.id(), "Current password did not verify");
                Err(DomainError::authentication(CURRENT_PASSWORD_FAILED))
            }
            Err(e) => {
                warn!(user_id = %user.id(), error = %e, "Stored credential could not be checked");
                Err(DomainError::authentication(CURRENT_PASSWORD_FAILED))
            }
        }
    }

    async fn save_user(&self, user: &User) -> Result<(), DomainError> {
        Ok(self.store.save_user(user).await?)
    }
}

fn require(field: Option<String>, name: &'static str) -> Result<String, DomainError> {
    field.ok_or_else(|| DomainError::validation(UserValidationError::MissingField(name).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{HashedPassword, MockUserStore, StoreError};
    use crate::domain::ErrorKind;
    use crate::infrastructure::user::in_memory_store::InMemoryUserStore;
    use crate::infrastructure::user::password::{verify_password, Argon2Hasher, BcryptHasher};

    type TestService = UserService<InMemoryUserStore, BcryptHasher>;

    fn create_service() -> (TestService, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let hasher = Arc::new(BcryptHasher::new(24, 4));
        (UserService::new(store.clone(), hasher), store)
    }

    fn alice() -> CreateUserRequest {
        CreateUserRequest::new("alice", "alice@example.com", "correcthorse")
    }

    #[tokio::test]
    async fn test_create_user_defaults() {
        let (service, _) = create_service();

        let created = service.create_user(alice()).await.unwrap();
        let fetched = service.get_user(created.id()).await.unwrap();

        assert_eq!(fetched.username(), "alice");
        assert_eq!(fetched.email(), "alice@example.com");
        assert!(fetched.is_enabled());
        assert!(!fetched.is_admin());
        assert!(!fetched.admin_forced_password_reset());
        assert!(!fetched.salt().is_empty());
        assert!(verify_password("correcthorse", fetched.salt(), fetched.password_hash()).unwrap());
    }

    #[tokio::test]
    async fn test_create_user_explicit_flags() {
        let (service, _) = create_service();

        let request = alice().with_admin(true).with_forced_password_reset(true);
        let created = service.create_user(request).await.unwrap();
        let fetched = service.get_user(created.id()).await.unwrap();

        assert!(fetched.is_admin());
        assert!(fetched.admin_forced_password_reset());
        assert!(fetched.is_enabled());
    }

    #[tokio::test]
    async fn test_create_user_never_stores_plaintext() {
        let (service, _) = create_service();

        let user = service.create_user(alice()).await.unwrap();

        let stored = String::from_utf8_lossy(user.password_hash());
        assert!(!stored.contains("correcthorse"));
        assert!(!user.salt().contains("correcthorse"));
    }

    #[tokio::test]
    async fn test_same_password_different_users_different_hashes() {
        let (service, _) = create_service();

        let first = service.create_user(alice()).await.unwrap();
        let second = service
            .create_user(CreateUserRequest::new("bob", "bob@example.com", "correcthorse"))
            .await
            .unwrap();

        assert_ne!(first.salt(), second.salt());
        assert_ne!(first.password_hash(), second.password_hash());
    }

    #[tokio::test]
    async fn test_create_user_missing_fields() {
        let (service, store) = create_service();

        for request in [
            CreateUserRequest {
                username: None,
                ..alice()
            },
            CreateUserRequest {
                email: None,
                ..alice()
            },
            CreateUserRequest {
                password: None,
                ..alice()
            },
        ] {
            let err = service.create_user(request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_user_invalid_fields() {
        let (service, _) = create_service();

        let err = service
            .create_user(CreateUserRequest::new("ab", "ab@example.com", "correcthorse"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .create_user(CreateUserRequest::new("alice", "not-an-email", "correcthorse"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .create_user(CreateUserRequest::new("alice", "alice@example.com", "short"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_create_duplicate_username() {
        let (service, _) = create_service();

        service.create_user(alice()).await.unwrap();

        let err = service.create_user(alice()).await.unwrap_err();
        assert!(matches!(err, DomainError::Store(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_user_invalid_cost() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = UserService::new(store.clone(), Arc::new(BcryptHasher::new(24, 99)));

        let err = service.create_user(alice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Hashing);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let (service, _) = create_service();

        let err = service.get_user(UserId::new(42).unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let (service, _) = create_service();
        let user = service.create_user(alice()).await.unwrap();

        let err = service
            .change_password(user.id(), "wrongpass", "newpassword")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(
            err.to_string(),
            "Authentication failed: current password validation failed"
        );

        let stored = service.get_user(user.id()).await.unwrap();
        assert_eq!(stored.salt(), user.salt());
        assert_eq!(stored.password_hash(), user.password_hash());
    }

    #[tokio::test]
    async fn test_change_password_success() {
        let (service, _) = create_service();
        let user = service.create_user(alice()).await.unwrap();

        service
            .change_password(user.id(), "correcthorse", "newpassword")
            .await
            .unwrap();

        let stored = service.get_user(user.id()).await.unwrap();
        assert_ne!(stored.salt(), user.salt());
        assert_ne!(stored.password_hash(), user.password_hash());
        assert!(verify_password("newpassword", stored.salt(), stored.password_hash()).unwrap());
        assert!(!verify_password("correcthorse", stored.salt(), stored.password_hash()).unwrap());

        // Only the credential changes
        assert_eq!(stored.is_admin(), user.is_admin());
        assert_eq!(stored.is_enabled(), user.is_enabled());
    }

    #[tokio::test]
    async fn test_change_password_to_same_plaintext_rotates_salt() {
        let (service, _) = create_service();
        let user = service.create_user(alice()).await.unwrap();

        service
            .change_password(user.id(), "correcthorse", "correcthorse")
            .await
            .unwrap();

        let stored = service.get_user(user.id()).await.unwrap();
        assert_ne!(stored.salt(), user.salt());
        assert!(verify_password("correcthorse", stored.salt(), stored.password_hash()).unwrap());
    }

    #[tokio::test]
    async fn test_change_password_unknown_user_is_authentication_error() {
        let (service, _) = create_service();

        let err = service
            .change_password(UserId::new(42).unwrap(), "correcthorse", "newpassword")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_change_password_rejects_weak_new_password() {
        let (service, _) = create_service();
        let user = service.create_user(alice()).await.unwrap();

        let err = service
            .change_password(user.id(), "correcthorse", "short")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = service.get_user(user.id()).await.unwrap();
        assert_eq!(stored.salt(), user.salt());
    }

    #[tokio::test]
    async fn test_change_password_malformed_stored_hash() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = UserService::new(store.clone(), Arc::new(BcryptHasher::new(24, 4)));

        let user = store
            .create_user(NewUser::new(
                "alice",
                "alice@example.com",
                HashedPassword::new(b"garbage".to_vec(), "c2FsdA=="),
                false,
                false,
            ))
            .await
            .unwrap();

        let err = service
            .change_password(user.id(), "correcthorse", "newpassword")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!err.to_string().contains("garbage"));
    }

    #[tokio::test]
    async fn test_update_admin_role() {
        let (service, _) = create_service();
        let user = service.create_user(alice()).await.unwrap();

        service.update_admin_role(user.id(), true).await.unwrap();

        let stored = service.get_user(user.id()).await.unwrap();
        assert!(stored.is_admin());
        assert!(stored.is_enabled());
        assert_eq!(stored.salt(), user.salt());
        assert_eq!(stored.password_hash(), user.password_hash());

        service.update_admin_role(user.id(), false).await.unwrap();
        assert!(!service.get_user(user.id()).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_update_admin_role_missing_user() {
        let (service, _) = create_service();

        let err = service
            .update_admin_role(UserId::new(42).unwrap(), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_user_status_requires_password_by_default() {
        let (service, _) = create_service();
        let user = service
            .create_user(alice().with_admin(true))
            .await
            .unwrap();

        let err = service
            .update_user_status(user.id(), None, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);

        let err = service
            .update_user_status(user.id(), Some("wrongpass"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(service.get_user(user.id()).await.unwrap().is_enabled());

        service
            .update_user_status(user.id(), Some("correcthorse"), false)
            .await
            .unwrap();

        let stored = service.get_user(user.id()).await.unwrap();
        assert!(!stored.is_enabled());
        assert!(stored.is_admin());
        assert_eq!(stored.salt(), user.salt());
        assert_eq!(stored.password_hash(), user.password_hash());
    }

    #[tokio::test]
    async fn test_update_user_status_unchecked_policy() {
        let (service, _) = create_service();
        let service = service.with_status_update_policy(StatusUpdatePolicy::Unchecked);
        let user = service.create_user(alice()).await.unwrap();

        service
            .update_user_status(user.id(), Some("anything"), false)
            .await
            .unwrap();
        assert!(!service.get_user(user.id()).await.unwrap().is_enabled());

        service.update_user_status(user.id(), None, true).await.unwrap();
        assert!(service.get_user(user.id()).await.unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_update_user_status_missing_user() {
        let (service, _) = create_service();

        let err = service
            .update_user_status(UserId::new(42).unwrap(), Some("correcthorse"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let user = NewUser::new(
            "alice",
            "alice@example.com",
            HashedPassword::new(b"hash".to_vec(), "c2FsdA=="),
            false,
            false,
        )
        .into_user(UserId::new(1).unwrap());

        let mut store = MockUserStore::new();
        store
            .expect_get_user_by_id()
            .returning(move |_| Ok(user.clone()));
        store
            .expect_save_user()
            .returning(|_| Err(StoreError::backend("connection reset")));

        let service = UserService::new(Arc::new(store), Arc::new(BcryptHasher::new(24, 4)));

        let err = service
            .update_admin_role(UserId::new(1).unwrap(), true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Store(StoreError::Backend { ref message }) if message == "connection reset"
        ));
    }

    #[tokio::test]
    async fn test_create_user_store_failure() {
        let mut store = MockUserStore::new();
        store
            .expect_create_user()
            .times(1)
            .returning(|_| Err(StoreError::backend("disk full")));

        let service = UserService::new(Arc::new(store), Arc::new(BcryptHasher::new(24, 4)));

        let err = service.create_user(alice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[tokio::test]
    async fn test_works_with_trait_objects() {
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(24, 4));
        let service = UserService::new(store, hasher);

        let user = service.create_user(alice()).await.unwrap();
        assert!(service.get_user(user.id()).await.unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_change_password_after_switching_algorithm() {
        let store = Arc::new(InMemoryUserStore::new());
        let bcrypt = UserService::new(store.clone(), Arc::new(BcryptHasher::new(24, 4)));
        let user = bcrypt.create_user(alice()).await.unwrap();

        let argon2 = UserService::new(store, Arc::new(Argon2Hasher::new(24, 1)));
        argon2
            .change_password(user.id(), "correcthorse", "newpassword")
            .await
            .unwrap();

        let stored = argon2.get_user(user.id()).await.unwrap();
        assert!(std::str::from_utf8(stored.password_hash()).unwrap().starts_with("$argon2id$"));

        // Records written by the new algorithm still verify through the old one
        bcrypt
            .update_user_status(user.id(), Some("newpassword"), false)
            .await
            .unwrap();
        assert!(!bcrypt.get_user(user.id()).await.unwrap().is_enabled());
    }

    #[test]
    fn test_request_debug_redacts_password() {
        let debug = format!("{:?}", alice());
        assert!(!debug.contains("correcthorse"));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn test_request_deserialize_optional_fields() {
        let request: CreateUserRequest = serde_json::from_str(
            r#"{"username": "alice", "email": "alice@example.com", "password": "correcthorse"}"#,
        )
        .unwrap();

        assert_eq!(request.username.as_deref(), Some("alice"));
        assert!(request.admin.is_none());
        assert!(request.admin_forced_password_reset.is_none());
    }

    #[tokio::test]
    async fn test_alice_scenario() {
        let (service, _) = create_service();

        let alice = service.create_user(alice()).await.unwrap();
        let fetched = service.get_user(alice.id()).await.unwrap();
        assert!(!fetched.is_admin());
        assert!(fetched.is_enabled());

        let err = service
            .change_password(alice.id(), "wrongpass", "newpassword")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        let unchanged = service.get_user(alice.id()).await.unwrap();
        assert_eq!(unchanged.password_hash(), fetched.password_hash());

        service
            .change_password(alice.id(), "correcthorse", "newpassword")
            .await
            .unwrap();

        let updated = service.get_user(alice.id()).await.unwrap();
        assert!(verify_password("newpassword", updated.salt(), updated.password_hash()).unwrap());
        assert!(!verify_password("correcthorse", updated.salt(), updated.password_hash()).unwrap());
    }
}
