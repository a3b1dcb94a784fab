//! In-memory user store implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{NewUser, StoreError, User, UserId, UserStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    /// Index for username -> user ID lookup
    username_index: HashMap<String, UserId>,
    last_id: i64,
}

/// In-memory implementation of UserStore
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryUserStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if state.username_index.contains_key(user.username()) {
            return Err(StoreError::conflict(format!(
                "Username '{}' already exists",
                user.username()
            )));
        }

        let id = UserId::new(state.last_id + 1)
            .map_err(|e| StoreError::backend(format!("Failed to allocate user ID: {}", e)))?;
        state.last_id = id.as_i64();

        let user = user.into_user(id);
        state.username_index.insert(user.username().to_string(), id);
        state.users.insert(id, user.clone());

        Ok(user)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<User, StoreError> {
        let state = self.state.read().await;

        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("User '{}' not found", id)))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let id = user.id();

        let old_username = match state.users.get(&id) {
            Some(existing) => existing.username().to_string(),
            None => return Err(StoreError::not_found(format!("User '{}' not found", id))),
        };

        // If username changed, check uniqueness and update index
        if old_username != user.username() {
            if state.username_index.contains_key(user.username()) {
                return Err(StoreError::conflict(format!(
                    "Username '{}' already exists",
                    user.username()
                )));
            }

            state.username_index.remove(&old_username);
            state.username_index.insert(user.username().to_string(), id);
        }

        state.users.insert(id, user.clone());

        Ok(())
    }
}
