use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert, insert_or_update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SpannerConfig;
use crate::models::{Page, PageRequest};
use crate::record::{EMPTY_ID, EntityRecord, RecordId, SoftDelete};
use crate::repository::Repository;

/// Shareable Spanner client for use across async handlers
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
    database_path: String,
}

impl SpannerClient {
    /// Create a new Spanner client from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// The instance and database are created first if they don't exist.
    /// Tables are provisioned per resource by [`SpannerClient::ensure_table`].
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        if let Some(host) = &config.emulator_host {
            tracing::info!("Connecting to Spanner emulator at: {}", host);
        } else {
            tracing::info!("Connecting to production Spanner");
        }

        // ClientConfig::default() automatically uses SPANNER_EMULATOR_HOST if set
        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
            database_path,
        })
    }

    /// Get a reference to the underlying Spanner client
    pub fn client(&self) -> &Client {
        &self.inner
    }

    /// Create the record table for a resource if it doesn't exist
    pub async fn ensure_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;

        let admin_client = AdminClient::new(AdminClientConfig::default())
            .await
            .context("Failed to create Spanner admin client")?;

        ensure_table_exists(&admin_client, &self.database_path, table).await
    }

    /// Perform a health check by executing a simple query
    ///
    /// # Errors
    /// Returns an error if the Spanner query fails or if the transaction cannot be created
    pub async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// Repository storing each entity as a JSON document in its own table
///
/// `id`, `deleted` and `deleted_at` live in dedicated columns so list
/// queries can filter and order on them. They take precedence over the
/// copies inside the JSON document when a row is read back.
pub struct SpannerRepository<E> {
    client: SpannerClient,
    table: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SpannerRepository<E> {
    /// Bind a repository to `table`, creating the table if needed.
    pub async fn new(client: SpannerClient, table: &str) -> Result<Self> {
        client.ensure_table(table).await?;
        Ok(Self {
            client,
            table: table.to_string(),
            _entity: PhantomData,
        })
    }
}

impl<E> SpannerRepository<E>
where
    E: EntityRecord + Serialize + DeserializeOwned,
{
    fn decode_row(row: &gcloud_spanner::row::Row) -> Result<E> {
        let id: i64 = row.column_by_name("id")?;
        let data: String = row.column_by_name("data")?;
        let deleted: bool = row.column_by_name("deleted")?;
        let deleted_at: Option<String> = row.column_by_name("deleted_at")?;

        let mut entity: E = serde_json::from_str(&data)
            .with_context(|| format!("Failed to deserialize row {}", id))?;

        let deleted_at = deleted_at
            .map(|ts| {
                DateTime::parse_from_rfc3339(&ts)
                    .map(|ts| ts.with_timezone(&Utc))
                    .context("Failed to parse deleted_at timestamp")
            })
            .transpose()?;

        entity.set_id(id);
        *entity.soft_delete_mut() = SoftDelete { deleted, deleted_at };
        Ok(entity)
    }
}

#[async_trait]
impl<E> Repository<E> for SpannerRepository<E>
where
    E: EntityRecord + Serialize + DeserializeOwned,
{
    async fn find_by_id(&self, id: RecordId) -> Result<Option<E>> {
        let mut statement = Statement::new(&select_by_id_sql(&self.table));
        statement.add_param("id", &id);

        let mut tx = self
            .client
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query row from Spanner")?;

        if let Some(row) = result_set.next().await? {
            tracing::debug!("Read row {} from {}", id, self.table);
            Ok(Some(Self::decode_row(&row)?))
        } else {
            tracing::debug!("Row {} not found in {}", id, self.table);
            Ok(None)
        }
    }

    async fn find_all(&self, request: &PageRequest) -> Result<Page<E>> {
        let mut tx = self
            .client
            .inner
            .single()
            .await
            .context("Failed to create read transaction for count")?;

        let mut count_result = tx
            .query(Statement::new(&count_sql(&self.table)))
            .await
            .context("Failed to execute count query")?;

        let total_count: i64 = if let Some(row) = count_result.next().await? {
            row.column_by_name("count")?
        } else {
            0
        };

        let mut tx = self
            .client
            .inner
            .single()
            .await
            .context("Failed to create read transaction for data")?;

        let mut data_result = tx
            .query(Statement::new(&list_sql(&self.table, request)))
            .await
            .context("Failed to execute data query")?;

        let mut content = Vec::new();
        while let Some(row) = data_result.next().await? {
            content.push(Self::decode_row(&row)?);
        }

        tracing::debug!(
            "Listed {} rows from {} (total: {}, page: {}, size: {})",
            content.len(),
            self.table,
            total_count,
            request.page(),
            request.size()
        );

        Ok(Page {
            content,
            request: *request,
            total_elements: u64::try_from(total_count).unwrap_or(0),
        })
    }

    async fn save(&self, mut entity: E) -> Result<E> {
        let is_new = entity.id() == EMPTY_ID;
        if is_new {
            entity.set_id(generate_id());
        }

        let id = entity.id();
        let data = serde_json::to_string(&entity).context("Failed to serialize entity")?;
        let marker = *entity.soft_delete();
        let deleted_at = marker.deleted_at.map(|ts| ts.to_rfc3339());

        let mutation = if is_new {
            insert(
                &self.table,
                &["id", "data", "deleted", "deleted_at", "created_at", "updated_at"],
                &[
                    &id,
                    &data,
                    &marker.deleted,
                    &deleted_at,
                    &CommitTimestamp::new(),
                    &CommitTimestamp::new(),
                ],
            )
        } else {
            insert_or_update(
                &self.table,
                &["id", "data", "deleted", "deleted_at", "updated_at"],
                &[&id, &data, &marker.deleted, &deleted_at, &CommitTimestamp::new()],
            )
        };

        self
            .client
            .inner
            .apply(vec![mutation])
            .await
            .context("Failed to save row to Spanner")?;

        tracing::debug!("Saved row {} to {}", id, self.table);
        Ok(entity)
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        self
            .client
            .inner
            .apply(vec![delete(&self.table, Key::new(&id))])
            .await
            .context("Failed to delete row from Spanner")?;

        tracing::debug!("Deleted row {} from {}", id, self.table);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.client.health_check().await
    }
}

/// Random positive id. Spanner favours non-sequential primary keys.
fn generate_id() -> RecordId {
    let id = (Uuid::new_v4().as_u128() >> 65) as i64;
    id.max(1)
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && table.len() <= 128;

    if !valid {
        bail!("Invalid table name: '{}'", table);
    }
    Ok(())
}

fn select_by_id_sql(table: &str) -> String {
    format!("SELECT id, data, deleted, deleted_at FROM {} WHERE id = @id", table)
}

fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) AS count FROM {} WHERE deleted = false", table)
}

fn list_sql(table: &str, request: &PageRequest) -> String {
    // In Spanner SQL, LIMIT must come before OFFSET
    format!(
        "SELECT id, data, deleted, deleted_at FROM {} WHERE deleted = false ORDER BY id ASC LIMIT {} OFFSET {}",
        table,
        request.size(),
        request.offset()
    )
}

fn create_table_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {} (
    id INT64 NOT NULL,
    data STRING(MAX) NOT NULL,
    deleted BOOL NOT NULL,
    deleted_at STRING(64),
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)
"#,
        table
    )
    .trim()
    .to_string()
}

/// Automatically provision the Spanner instance and database
///
/// This function checks if the configured resources exist and creates them if needed.
/// It's designed to enable zero-setup local development with the emulator.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;

    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// Ensure a record table exists, creating it if necessary
async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let plain = format!("CREATE TABLE {} ", table);
    let quoted = format!("CREATE TABLE `{}` ", table);
    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| stmt.starts_with(&plain) || stmt.starts_with(&quoted));

    if table_exists {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![create_table_ddl(table)],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}
