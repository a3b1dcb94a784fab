//! Infrastructure layer
//!
//! Concrete hashing, storage and logging behind the domain traits.

pub mod logging;
pub mod storage;
pub mod user;
