//! User infrastructure module
//!
//! This module provides implementations for credential management,
//! including salted password hashing, in-memory and PostgreSQL stores,
//! and the user service.

mod in_memory_store;
pub mod password;
mod postgres_store;
mod service;

pub use in_memory_store::InMemoryUserStore;
pub use password::{
    generate_salt, hash_password, hasher_from_config, verify_argon2_password, verify_password,
    verify_stored_password, Argon2Hasher, BcryptHasher, PasswordHasher,
};
pub use postgres_store::PostgresUserStore;
pub use service::{CreateUserRequest, UserService};
