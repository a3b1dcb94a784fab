//! CLI module for the credential service
//!
//! Provides administrative subcommands against the PostgreSQL store:
//! - `migrate`: create or upgrade the users table
//! - `user ...`: create, inspect and modify accounts

pub mod migrate;
pub mod users;

use clap::{Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Credential Service - account and password administration
#[derive(Parser)]
#[command(name = "credential-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Manage user accounts
    #[command(subcommand)]
    User(users::UserCommand),
}

/// Load configuration, start logging and connect to PostgreSQL
pub(crate) async fn bootstrap() -> anyhow::Result<(AppConfig, PgPool)> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    config.auth.validate()?;

    let database_url = config.database.resolve_url().ok_or_else(|| {
        anyhow::anyhow!("database.url or DATABASE_URL environment variable is required")
    })?;

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;
    info!("PostgreSQL connection established");

    Ok((config, pool))
}
