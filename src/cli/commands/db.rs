use anyhow::Context;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let settings = &config().database;
    let pool = DatabaseManager::connect(settings)
        .await
        .context("failed to connect to DATABASE_URL")?;
    DatabaseManager::migrate(&pool).await.context("migration failed")?;

    output_success(
        &output_format,
        "Database migrations applied",
        Some(json!({ "max_connections": settings.max_connections })),
    )
}
