//! Storage infrastructure - schema management for the PostgreSQL store

pub mod migrations;

pub use migrations::{run_user_migrations, user_migrations, Migration, PostgresMigrator};
