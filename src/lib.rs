//! Credential Service
//!
//! Account lifecycle and credential management:
//! - Account creation with safe defaults (enabled, non-admin)
//! - Salted, tunable-cost password hashing (bcrypt or Argon2id)
//! - Password changes gated on the current password
//! - Administrative role and enabled-state updates
//!
//! Storage is reached only through [`domain::user::UserStore`]; in-memory and
//! PostgreSQL implementations live in [`infrastructure::user`].

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{DomainError, ErrorKind};
pub use infrastructure::user::{CreateUserRequest, UserService};
