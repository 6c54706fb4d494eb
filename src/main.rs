//src/main.rs

use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod models;
mod schema;
mod services;

use crate::config::{AppConfig, AppState, StoreBackend};
use crate::db::{MemoryStore, PgStore, Transactional};
use crate::services::FixtureReport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;

    let report = match config.backend {
        StoreBackend::Postgres => {
            let pool = config.connect_pool().await?;

            // Migrações incluem o seed do fixture
            if config.run_migrations {
                sqlx::migrate!().run(&pool).await?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
            }

            let state = AppState::new(PgStore::new(pool), &config);
            verify(&state).await?
        }
        StoreBackend::Memory => {
            tracing::info!("🧪 Usando o store em memória");
            let state = AppState::new(MemoryStore::new(), &config);
            state.fixture_service.seed().await?;
            verify(&state).await?
        }
    };

    tracing::info!("📊 Relatório do fixture: {}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn verify<S: Transactional>(state: &AppState<S>) -> anyhow::Result<FixtureReport> {
    let report = state.fixture_service.verify().await?;
    Ok(report)
}
