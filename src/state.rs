use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::record::EntityRecord;
use crate::repository::{MemoryRepository, Repository};
use crate::spanner::{SpannerClient, SpannerRepository};

/// Storage selected at startup
#[derive(Clone)]
pub enum Backend {
    Memory,
    Spanner(SpannerClient),
}

impl Backend {
    pub async fn connect(config: &Config) -> Result<Self> {
        match &config.storage {
            StorageBackend::Memory => Ok(Backend::Memory),
            StorageBackend::Spanner(spanner) => {
                Ok(Backend::Spanner(SpannerClient::from_config(spanner).await?))
            }
        }
    }

    /// Repository for one resource, provisioning its table if needed
    pub async fn repository<E>(&self, table: &str) -> Result<Arc<dyn Repository<E>>>
    where
        E: EntityRecord + Serialize + DeserializeOwned,
    {
        match self {
            Backend::Memory => Ok(Arc::new(MemoryRepository::<E>::new())),
            Backend::Spanner(client) => {
                Ok(Arc::new(SpannerRepository::<E>::new(client.clone(), table).await?))
            }
        }
    }
}

/// Connectivity check behind `GET /health`
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl HealthCheck for Backend {
    async fn health_check(&self) -> Result<()> {
        match self {
            Backend::Memory => Ok(()),
            Backend::Spanner(client) => client.health_check().await,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health: Arc<dyn HealthCheck>,
    pub config: Arc<Config>,
}
