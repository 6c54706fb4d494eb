// src/config.rs

use anyhow::{Context, bail};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::services::{AccountService, AuditService, FixtureService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("STORE_BACKEND inválido: '{}' (use 'postgres' ou 'memory')", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub bcrypt_cost: u32,
    pub run_migrations: bool,
}

// Lê uma variável opcional e converte, com o nome da variável no erro
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} inválida ('{}'): {}", key, raw, e)),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend = match lookup("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StoreBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida para o backend postgres");
        }

        let bcrypt_cost = parse_var(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST deve estar entre 4 e 31 (recebido {})", bcrypt_cost);
        }

        Ok(Self {
            backend,
            database_url,
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(parse_var(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            bcrypt_cost,
            run_migrations: parse_var(&lookup, "RUN_MIGRATIONS", true)?,
        })
    }

    pub async fn connect_pool(&self) -> anyhow::Result<PgPool> {
        let database_url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL deve ser definida")?;

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

// --- Monta o gráfico de dependências ---
pub struct AppState<S> {
    pub store: Arc<S>,
    pub audit_service: AuditService<S>,
    pub account_service: AccountService<S>,
    pub fixture_service: FixtureService<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            audit_service: self.audit_service.clone(),
            account_service: self.account_service.clone(),
            fixture_service: self.fixture_service.clone(),
        }
    }
}

impl<S: crate::db::Transactional> AppState<S> {
    pub fn new(store: S, config: &AppConfig) -> Self {
        let store = Arc::new(store);
        let audit_service = AuditService::new(store.clone());
        let account_service = AccountService::new(store.clone(), config.bcrypt_cost);
        let fixture_service = FixtureService::new(store.clone());

        Self {
            store,
            audit_service,
            account_service,
            fixture_service,
        }
    }
}
