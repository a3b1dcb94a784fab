//! Migrate command - applies the user table migrations

use tracing::info;

use crate::infrastructure::storage::run_user_migrations;

pub async fn run() -> anyhow::Result<()> {
    let (_, pool) = super::bootstrap().await?;

    let applied = run_user_migrations(&pool).await?;
    info!("Applied {} migration(s)", applied);

    pool.close().await;
    Ok(())
}
