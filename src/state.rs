use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::{AppConfig, StoreBackend};
use crate::users::{MemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let users = match config.store {
            StoreBackend::Postgres => {
                let db = connect(&config).await?;
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; records are lost on exit");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self { config, users })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self {
            config: Arc::new(AppConfig::memory()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let url = config
        .db
        .url
        .as_deref()
        .context("DATABASE_URL is not set")?;
    let db = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .connect(url)
        .await
        .context("connect to database")?;

    // The unique index on users.email backs the duplicate-email check.
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    Ok(db)
}
