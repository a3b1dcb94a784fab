//! Domain layer
//!
//! Entities, validation rules and the storage contract for user credentials.
//! Nothing here depends on a concrete hashing algorithm or storage engine.

pub mod error;
pub mod user;

pub use error::{DomainError, ErrorKind};
