use anyhow::{Context, Result, bail};
use std::env;

/// Where records are persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store, lost on restart
    Memory,
    /// Google Cloud Spanner (or its emulator)
    Spanner(SpannerConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub service_port: u16,
    pub service_host: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "memory".to_string());

        let storage = match backend.to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "spanner" => {
                let emulator_host = lookup("SPANNER_EMULATOR_HOST");

                let project = lookup("SPANNER_PROJECT")
                    .context("SPANNER_PROJECT environment variable is required")?;

                let instance = lookup("SPANNER_INSTANCE")
                    .context("SPANNER_INSTANCE environment variable is required")?;

                let database = lookup("SPANNER_DATABASE")
                    .context("SPANNER_DATABASE environment variable is required")?;

                StorageBackend::Spanner(SpannerConfig {
                    emulator_host,
                    project,
                    instance,
                    database,
                })
            }
            other => bail!("STORAGE_BACKEND must be 'memory' or 'spanner', got '{}'", other),
        };

        let service_port = lookup("SERVICE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = lookup("SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let default_page_size = lookup("DEFAULT_PAGE_SIZE")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("DEFAULT_PAGE_SIZE must be a positive integer")?;

        let max_page_size = lookup("MAX_PAGE_SIZE")
            .unwrap_or_else(|| "100".to_string())
            .parse::<u32>()
            .context("MAX_PAGE_SIZE must be a positive integer")?;

        if default_page_size == 0 || default_page_size > max_page_size {
            bail!(
                "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({}), got {}",
                max_page_size,
                default_page_size
            );
        }

        Ok(Config {
            storage,
            service_port,
            service_host,
            default_page_size,
            max_page_size,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.storage {
            StorageBackend::Memory => {
                tracing::info!("  Storage backend: memory (records are not persisted)");
            }
            StorageBackend::Spanner(spanner) => {
                tracing::info!("  Storage backend: spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner project: {}", spanner.project);
                tracing::info!("  Spanner instance: {}", spanner.instance);
                tracing::info!("  Spanner database: {}", spanner.database);
            }
        }
        tracing::info!(
            "  Page size: default {}, max {}",
            self.default_page_size,
            self.max_page_size
        );
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}
