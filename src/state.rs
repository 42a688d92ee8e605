use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::{AppConfig, StorageConfig, StoreBackend};
use crate::profiles::{MemoryProfileStore, PgProfileStore, ProfileStore};
use crate::storage::{LocalStorage, S3Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ProfileStore>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Connects the configured store (running migrations for Postgres) and storage.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store: Arc<dyn ProfileStore> = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres store")?;
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("postgres store ready");
                Arc::new(PgProfileStore::new(db))
            }
            StoreBackend::Memory => {
                info!("in-memory store ready");
                Arc::new(MemoryProfileStore::new())
            }
        };

        let storage: Arc<dyn StorageClient> = match &config.storage {
            StorageConfig::Local { root } => {
                tokio::fs::create_dir_all(root)
                    .await
                    .with_context(|| format!("create upload dir {}", root.display()))?;
                Arc::new(LocalStorage::new(root.clone()))
            }
            StorageConfig::S3(s3) => Arc::new(S3Storage::new(s3).await?),
        };

        Ok(Self {
            config,
            store,
            storage,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn ProfileStore>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            config,
            store,
            storage,
        }
    }
}
