use std::sync::Arc;

use supportdesk_agent::runtime::AgentRuntime;
use supportdesk_core::config::{AppConfig, ConfigError};
use supportdesk_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("agent runtime initialization failed: {0}")]
    Runtime(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let runtime =
        AgentRuntime::from_config(&config, db_pool.clone()).map_err(BootstrapError::Runtime)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        top_k = config.retrieval.top_k,
        confidence_threshold = config.retrieval.confidence_threshold,
        handoff_configured = config.handoff.webhook_url().is_some(),
        "agent runtime initialized"
    );

    Ok(Application { config, db_pool, runtime: Arc::new(runtime) })
}

#[cfg(test)]
mod tests {
    use supportdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use supportdesk_core::domain::turn::Turn;

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    fn config_for(database_url: &str) -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load")
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_answers_turns() {
        let app = bootstrap_with_config(config_for("sqlite::memory:"))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kb_docs'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("kb_docs should exist after bootstrap");
        assert_eq!(table_count, 1);

        let response = app
            .runtime
            .handle_turn(&Turn::new("s-boot", "order C789"), "bootstrap-test")
            .await
            .expect("turn");
        assert_eq!(response.text, "Order C789: Delivered. ETA 0 day(s).");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn unreachable_database_fails_fast() {
        let dir = std::env::temp_dir().join("supportdesk-missing-parent").join("nested");
        let url = format!("sqlite://{}/kb.db", dir.display());

        let result = bootstrap_with_config(config_for(&url)).await;

        assert!(matches!(result, Err(BootstrapError::DatabaseConnect(_))));
    }
}
