//! User domain
//!
//! This module provides domain types and traits for credential management,
//! including user entities, validation, and the store trait.

mod entity;
mod store;
mod validation;

pub use entity::{HashedPassword, NewUser, User, UserId};
pub use store::{StoreError, UserStore};
pub use validation::{
    validate_email, validate_password, validate_user_id, validate_username, UserValidationError,
};

#[cfg(test)]
pub use store::MockUserStore;
