use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DbConfig;

/// Opens the shared pool. The `users` table is expected to exist
/// (see `schema/users.sql`).
pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.acquire_timeout)
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    tracing::info!(max_connections = cfg.max_connections, "database pool ready");
    Ok(db)
}
