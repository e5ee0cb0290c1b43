//! Elasticsearch adapter configuration and connection lifecycle.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::BaseAdapter;
use crate::error::{BackendError, StorageResult, ValidationError};
use crate::types::RecordTypes;

use super::dialect::{ApiVersion, Dialect, VersionShim};
use super::schema;
use super::transport::{ElasticsearchTransport, EsRequest, EsResponse, EsTransport};

/// Log levels accepted by [`ElasticsearchConfig::log_level`].
const LOG_LEVELS: &[&str] = &["error", "warning", "warn", "info", "debug", "trace"];

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for the Elasticsearch adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (default: `["http://localhost:9200"]`).
    /// Several nodes are load balanced round-robin.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Index holding every record type (default: `"docbridge"`).
    #[serde(default = "default_index")]
    pub index: String,

    /// Log verbosity (default: `"error"`).
    ///
    /// The adapter does not install a subscriber; the process does, through
    /// [`ElasticsearchConfig::log_directive`] or, with the `logging` feature,
    /// [`ElasticsearchConfig::init_logging`].
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Engine API version (default: `"2.4"`). Selects the dialect.
    ///
    /// 6.x indices hold one mapping type, so those versions take exactly one
    /// record type.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Name of the primary-key field in records (default: `"id"`).
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_index() -> String {
    "docbridge".to_string()
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_api_version() -> String {
    "2.4".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            index: default_index(),
            log_level: default_log_level(),
            api_version: default_api_version(),
            primary_key: default_primary_key(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

impl ElasticsearchConfig {
    /// Checks every option that can be checked without contacting the engine.
    pub fn validate(&self) -> StorageResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(invalid("log_level", format!("unknown level '{}'", self.log_level)));
        }
        if self.index.is_empty() {
            return Err(invalid("index", "must not be empty"));
        }
        if self.primary_key.is_empty() {
            return Err(invalid("primary_key", "must not be empty"));
        }
        ApiVersion::parse(&self.api_version)?;
        Ok(())
    }

    /// `tracing` filter directive enabling this crate at [`Self::log_level`].
    pub fn log_directive(&self) -> String {
        crate::log_directive(&self.log_level)
    }

    /// Installs the global subscriber at [`Self::log_level`].
    #[cfg(feature = "logging")]
    pub fn init_logging(&self) {
        crate::init_logging(&self.log_level);
    }
}

fn invalid(option: &str, message: impl Into<String>) -> crate::error::StorageError {
    ValidationError::InvalidConfiguration {
        option: option.to_string(),
        message: message.into(),
    }
    .into()
}

/// The live connection: transport plus the dialect resolved at connect.
///
/// Created once per connect and shared read-only by every operation.
#[derive(Debug)]
pub(crate) struct EsConnection {
    pub(crate) transport: Arc<dyn EsTransport>,
    pub(crate) shim: VersionShim,
}

impl EsConnection {
    /// Sends a request, returning the response whatever its status.
    pub(crate) async fn send(&self, request: EsRequest) -> StorageResult<EsResponse> {
        tracing::debug!(
            operation = request.operation,
            path = %request.path,
            "Elasticsearch request"
        );
        Ok(self.transport.send(request).await?)
    }

    /// Sends a request and returns the body of a 2xx response.
    pub(crate) async fn send_ok(&self, request: EsRequest) -> StorageResult<Value> {
        let operation = request.operation;
        let response = self.send(request).await?;
        if !response.is_success() {
            tracing::error!(
                operation,
                status = response.status,
                body = %response.body,
                "Elasticsearch rejected request"
            );
        }
        response.into_success(operation)
    }
}

/// Elasticsearch adapter for generic record storage.
///
/// Every record type lives in one index. Whether the type is addressed
/// natively or through a discriminator field is decided by
/// [`ElasticsearchConfig::api_version`] at connect.
#[derive(Debug)]
pub struct ElasticsearchAdapter {
    base: BaseAdapter,
    config: ElasticsearchConfig,
    transport_override: Option<Arc<dyn EsTransport>>,
    connection: RwLock<Option<Arc<EsConnection>>>,
}

impl ElasticsearchAdapter {
    /// Creates a disconnected adapter for the given record types.
    ///
    /// Fails with `InvalidConfiguration` when the configuration is invalid, or
    /// when a single-mapping-type engine version is given several record types.
    pub fn new(config: ElasticsearchConfig, record_types: RecordTypes) -> StorageResult<Self> {
        config.validate()?;
        let version = ApiVersion::parse(&config.api_version)?;
        if version.single_mapping_type() && record_types.len() > 1 {
            return Err(invalid(
                "api_version",
                format!(
                    "engine {} indices hold one mapping type, got {} record types",
                    version,
                    record_types.len()
                ),
            ));
        }
        Ok(Self {
            base: BaseAdapter::new(record_types, config.primary_key.clone()),
            config,
            transport_override: None,
            connection: RwLock::new(None),
        })
    }

    /// Uses the given transport instead of building one from `hosts`.
    pub fn with_transport(mut self, transport: Arc<dyn EsTransport>) -> Self {
        self.transport_override = Some(transport);
        self
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Returns the engine-independent adapter state.
    pub fn base(&self) -> &BaseAdapter {
        &self.base
    }

    /// Active dialect, once connected.
    pub fn dialect(&self) -> Option<Dialect> {
        self.connection
            .read()
            .as_ref()
            .map(|conn| conn.shim.dialect())
    }

    /// Returns the live connection.
    pub(crate) fn connection(&self) -> StorageResult<Arc<EsConnection>> {
        self.connection
            .read()
            .clone()
            .ok_or_else(|| BackendError::NotConnected.into())
    }

    /// Opens the connection and prepares the index.
    ///
    /// Order: transport, discriminator template (typeless only), index,
    /// blob-field mappings. The connection is published only once every step
    /// succeeded.
    pub(crate) async fn open(&self) -> StorageResult<()> {
        let shim = VersionShim::new(&self.config.api_version, &self.config.index)?;
        let transport: Arc<dyn EsTransport> = match &self.transport_override {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ElasticsearchTransport::new(&self.config)?),
        };

        tracing::info!(
            index = %self.config.index,
            api_version = %shim.version(),
            dialect = ?shim.dialect(),
            "Connecting to Elasticsearch"
        );

        let connection = Arc::new(EsConnection { transport, shim });

        if connection.shim.requires_discriminator_template() {
            schema::install_discriminator_template(&connection).await?;
        }
        schema::ensure_index(&connection).await?;
        schema::ensure_mappings(&connection, self.base.record_types()).await?;

        *self.connection.write() = Some(connection);

        tracing::info!(
            index = %self.config.index,
            record_types = self.base.record_types().len(),
            "Elasticsearch adapter connected"
        );
        Ok(())
    }

    /// Drops the connection; in-flight operations keep their handle.
    pub(crate) fn close(&self) {
        if self.connection.write().take().is_some() {
            tracing::info!(index = %self.config.index, "Elasticsearch adapter disconnected");
        }
    }

    /// Refreshes the index to make recently written documents searchable.
    ///
    /// The engine refreshes on its own schedule; this is mostly for tests.
    pub async fn refresh(&self) -> StorageResult<()> {
        let conn = self.connection()?;
        conn.send_ok(conn.shim.refresh_request()).await?;
        Ok(())
    }
}
