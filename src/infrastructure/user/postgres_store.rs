//! PostgreSQL user store implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::user::{HashedPassword, NewUser, StoreError, User, UserId, UserStore};

const USER_COLUMNS: &str = "id, username, email, password_hash, salt, admin, \
     admin_forced_password_reset, enabled, created_at, updated_at";

/// PostgreSQL implementation of UserStore
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, salt, admin,
                               admin_forced_password_reset, enabled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING id
            "#,
        )
        .bind(user.username())
        .bind(user.email())
        .bind(user.credential().hash())
        .bind(user.credential().salt())
        .bind(user.is_admin())
        .bind(user.admin_forced_password_reset())
        .bind(user.created_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!("Username '{}' already exists", user.username()))
            } else {
                StoreError::backend(format!("Failed to create user: {}", e))
            }
        })?;

        let id: i64 = row.get("id");
        let id = UserId::new(id)
            .map_err(|e| StoreError::backend(format!("Invalid user ID in database: {}", e)))?;

        Ok(user.into_user(id))
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<User, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::backend(format!("Failed to get user: {}", e)))?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::not_found(format!("User '{}' not found", id))),
        }
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, salt = $5, admin = $6,
                admin_forced_password_reset = $7, enabled = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_i64())
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.salt())
        .bind(user.is_admin())
        .bind(user.admin_forced_password_reset())
        .bind(user.is_enabled())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!("Username '{}' already exists", user.username()))
            } else {
                StoreError::backend(format!("Failed to update user: {}", e))
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("User '{}' not found", user.id())));
        }

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, StoreError> {
    let id: i64 = row.get("id");
    let password_hash: Vec<u8> = row.get("password_hash");
    let salt: String = row.get("salt");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let user_id = UserId::new(id)
        .map_err(|e| StoreError::backend(format!("Invalid user ID in database: {}", e)))?;

    if salt.is_empty() {
        return Err(StoreError::backend(format!(
            "User '{}' has no salt stored",
            user_id
        )));
    }

    Ok(User::restore(
        user_id,
        row.get::<String, _>("username"),
        row.get::<String, _>("email"),
        HashedPassword::new(password_hash, salt),
        row.get("admin"),
        row.get("admin_forced_password_reset"),
        row.get("enabled"),
        created_at,
        updated_at,
    ))
}
