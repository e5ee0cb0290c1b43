//! Version compatibility shim.
//!
//! The engine exists in two addressing dialects:
//!
//! - **Typed** (API below 7.0): every document is addressed by index *and*
//!   type; the record type is the engine's native mapping type.
//! - **Typeless** (API 7.0 and later): mapping types are gone. The record type
//!   is stored in the document body under [`DISCRIMINATOR_FIELD`], searches
//!   filter on it, and an index template keeps that field an exact-match
//!   keyword.
//!
//! Engines of major version 6 still speak the typed dialect, but an index
//! created there holds a single mapping type, so such an adapter can serve
//! only one record type ([`ApiVersion::single_mapping_type`]).
//!
//! [`VersionShim`] is resolved once at connect and is the only place that
//! branches on the dialect; every other component asks it for paths, bulk
//! headers and dialect-specific clauses.

use serde_json::{Map, Value, json};

use crate::error::{StorageResult, ValidationError};

use super::transport::{EsRequest, HttpMethod};

/// Reserved document field holding the record type under the typeless dialect.
pub const DISCRIMINATOR_FIELD: &str = "docbridge_type";

/// First major version using the typeless dialect.
pub const TYPELESS_MAJOR: u32 = 7;

/// Major version whose indices accept exactly one mapping type.
const SINGLE_MAPPING_TYPE_MAJOR: u32 = 6;

/// First major version accepting a boolean `index` mapping flag.
const BOOLEAN_INDEX_FLAG_MAJOR: u32 = 5;

/// Engine API dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Per-document type addressing. On 6.x an index holds one mapping type,
    /// so only one record type can be served.
    Typed,
    /// Type folded into the document body.
    Typeless,
}

/// Parsed engine API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    /// Major version.
    pub major: u32,
    /// Minor version (0 when not given).
    pub minor: u32,
}

impl ApiVersion {
    /// Parses the leading `major[.minor]` of a version string.
    ///
    /// Trailing components are ignored, so `"5.6.3"` and `"6.x"` parse as 5.6
    /// and 6.0.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let invalid = || ValidationError::InvalidConfiguration {
            option: "api_version".to_string(),
            message: format!("'{}' does not start with a version number", raw),
        };

        let mut parts = raw.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| {
                let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
                digits.parse::<u32>().ok()
            })
            .unwrap_or(0);

        Ok(Self { major, minor })
    }

    /// Dialect spoken by this version.
    pub fn dialect(&self) -> Dialect {
        if self.major >= TYPELESS_MAJOR {
            Dialect::Typeless
        } else {
            Dialect::Typed
        }
    }

    /// Whether an index on this version holds at most one mapping type.
    ///
    /// Typed addressing maps each record type to its own mapping type, so
    /// these versions support a single record type per index.
    pub fn single_mapping_type(&self) -> bool {
        self.major == SINGLE_MAPPING_TYPE_MAJOR
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Dialect-aware request shaping for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionShim {
    version: ApiVersion,
    dialect: Dialect,
    index: String,
}

impl VersionShim {
    /// Resolves the dialect from a configured version string.
    pub fn new(api_version: &str, index: impl Into<String>) -> StorageResult<Self> {
        let version = ApiVersion::parse(api_version)?;
        Ok(Self {
            version,
            dialect: version.dialect(),
            index: index.into(),
        })
    }

    /// Active dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parsed API version.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Index every record type lives in.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Whether the discriminator template must be installed at connect.
    pub fn requires_discriminator_template(&self) -> bool {
        self.dialect == Dialect::Typeless
    }

    // ------------------------------------------------------------------
    // Document addressing
    // ------------------------------------------------------------------

    /// Bulk action header (`create`, `update`, `delete`) for one document.
    ///
    /// `id` may be omitted to let the engine assign one.
    pub fn bulk_header(&self, action: &str, record_type: &str, id: Option<&str>) -> Value {
        let mut target = Map::new();
        target.insert("_index".to_string(), json!(self.index));
        if self.dialect == Dialect::Typed {
            target.insert("_type".to_string(), json!(record_type));
        }
        if let Some(id) = id {
            target.insert("_id".to_string(), json!(id));
        }

        let mut header = Map::new();
        header.insert(action.to_string(), Value::Object(target));
        Value::Object(header)
    }

    /// Stamps the record type into a document body when the dialect needs it.
    pub fn embed_discriminator(&self, record_type: &str, doc: &mut Map<String, Value>) {
        if self.dialect == Dialect::Typeless {
            doc.insert(DISCRIMINATOR_FIELD.to_string(), json!(record_type));
        }
    }

    /// Mandatory search filter restricting hits to one record type.
    pub fn type_filter(&self, record_type: &str) -> Option<Value> {
        match self.dialect {
            Dialect::Typed => None,
            Dialect::Typeless => Some(json!({ "term": { DISCRIMINATOR_FIELD: record_type } })),
        }
    }

    /// Name of the discriminator field, when the dialect stores one.
    pub fn discriminator_field(&self) -> Option<&'static str> {
        match self.dialect {
            Dialect::Typed => None,
            Dialect::Typeless => Some(DISCRIMINATOR_FIELD),
        }
    }

    /// Whether a stored source belongs to another record type.
    ///
    /// Only a discriminator naming a different type makes a document foreign;
    /// typed addressing never reaches another type's documents.
    pub fn is_foreign(&self, record_type: &str, source: &Map<String, Value>) -> bool {
        match self.discriminator_field().and_then(|field| source.get(field)) {
            Some(Value::String(stored)) => stored != record_type,
            Some(_) => true,
            None => false,
        }
    }

    /// Whether search bodies must ask for exact total hit counts.
    ///
    /// Typeless engines cap `hits.total` unless asked.
    pub fn track_total_hits(&self) -> bool {
        self.dialect == Dialect::Typeless
    }

    /// Value of the `index` flag that disables indexing of a field.
    pub fn unindexed_flag(&self) -> Value {
        if self.version.major >= BOOLEAN_INDEX_FLAG_MAJOR {
            json!(false)
        } else {
            json!("no")
        }
    }

    /// Base path addressing one record type's documents.
    fn type_path(&self, record_type: &str) -> String {
        match self.dialect {
            Dialect::Typed => format!("/{}/{}", self.index, record_type),
            Dialect::Typeless => format!("/{}", self.index),
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Search request for one record type.
    pub fn search_request(&self, record_type: &str, body: Value) -> EsRequest {
        EsRequest::new(
            "search",
            HttpMethod::Post,
            format!("{}/_search", self.type_path(record_type)),
        )
        .json(body)
    }

    /// Multi-get request for one record type; `docs` are `{"_id", "_source"}` entries.
    pub fn mget_request(&self, record_type: &str, docs: Vec<Value>) -> EsRequest {
        EsRequest::new(
            "mget",
            HttpMethod::Post,
            format!("{}/_mget", self.type_path(record_type)),
        )
        .json(json!({ "docs": docs }))
    }

    /// Bulk request from interleaved header/payload lines.
    pub fn bulk_request(&self, lines: Vec<Value>) -> EsRequest {
        EsRequest::new("bulk", HttpMethod::Post, "/_bulk").nd_json(lines)
    }

    /// Delete-by-query request removing every document of a record type.
    pub fn delete_collection_request(&self, record_type: &str) -> EsRequest {
        let query = match self.type_filter(record_type) {
            Some(filter) => json!({ "bool": { "filter": [filter] } }),
            None => json!({ "match_all": {} }),
        };
        EsRequest::new(
            "delete_by_query",
            HttpMethod::Post,
            format!("{}/_delete_by_query", self.type_path(record_type)),
        )
        .json(json!({ "query": query }))
    }

    /// Mapping update for one record type from its `properties` object.
    ///
    /// Typed mappings nest under the type name; typeless mappings are flat.
    pub fn put_mapping_request(&self, record_type: &str, properties: Map<String, Value>) -> EsRequest {
        let (path, body) = match self.dialect {
            Dialect::Typed => (
                format!("/{}/_mapping/{}", self.index, record_type),
                json!({ record_type: { "properties": properties } }),
            ),
            Dialect::Typeless => (
                format!("/{}/_mapping", self.index),
                json!({ "properties": properties }),
            ),
        };
        EsRequest::new("put_mapping", HttpMethod::Put, path).json(body)
    }

    /// Index creation request.
    pub fn create_index_request(&self) -> EsRequest {
        EsRequest::new("create_index", HttpMethod::Put, format!("/{}", self.index))
    }

    /// Refresh request making recent writes searchable.
    pub fn refresh_request(&self) -> EsRequest {
        EsRequest::new("refresh", HttpMethod::Post, format!("/{}/_refresh", self.index))
    }

    /// Name of the discriminator index template.
    pub fn template_name(&self) -> String {
        format!("{}_{}", self.index, DISCRIMINATOR_FIELD)
    }

    /// Removes a previously installed discriminator template.
    pub fn delete_template_request(&self) -> EsRequest {
        EsRequest::new(
            "delete_template",
            HttpMethod::Delete,
            format!("/_template/{}", self.template_name()),
        )
    }

    /// Installs the template mapping the discriminator as a keyword.
    pub fn put_template_request(&self) -> EsRequest {
        EsRequest::new(
            "put_template",
            HttpMethod::Put,
            format!("/_template/{}", self.template_name()),
        )
        .json(json!({
            "index_patterns": [self.index],
            "mappings": {
                "properties": {
                    DISCRIMINATOR_FIELD: { "type": "keyword" }
                }
            }
        }))
    }
}
