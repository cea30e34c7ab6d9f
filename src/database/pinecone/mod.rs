
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::{PineconeConfig, PineconeCredentials};
use crate::http::{HttpClient, HttpError};
use crate::{BotError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Nearest-neighbour store keyed by record id.
///
/// `upsert` overwrites any record that already has the same id.
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records, returning how many the index accepted
    fn upsert(&self, records: &[IndexedRecord]) -> Result<usize>;

    /// The `top_k` records closest to `vector`, best first, with their metadata
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>>;

    fn describe_stats(&self) -> Result<IndexStats>;
}

/// A vector plus the chunk text it was computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl ScoredRecord {
    /// String metadata stored under `key`
    #[inline]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub index_fullness: Option<f32>,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub metric: Option<String>,
    /// Data-plane host, usually without a scheme
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub status: Option<IndexStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

/// What to create when the index is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: &'a str,
    spec: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudRegion<'a>,
}

#[derive(Debug, Serialize)]
struct CloudRegion<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedRecord],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredRecord>,
}

/// Control-plane client: lists, describes and creates indexes
pub struct PineconeClient {
    controller_url: Url,
    api_key: SecretString,
    api_version: String,
    http: HttpClient,
}

impl PineconeClient {
    #[inline]
    pub fn new(config: &PineconeConfig, credentials: &PineconeCredentials) -> Result<Self> {
        let controller_url = Url::parse(&config.controller_url).map_err(|e| {
            BotError::Config(format!(
                "Invalid Pinecone controller URL {}: {}",
                config.controller_url, e
            ))
        })?;

        Ok(Self {
            controller_url,
            api_key: credentials.api_key.clone(),
            api_version: config.api_version.clone(),
            http: HttpClient::new(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        })
    }

    #[inline]
    pub fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let url = join(&self.controller_url, "indexes")?;
        let text = self
            .http
            .get(&url, &self.headers())
            .map_err(|e| index_error("list indexes", &e))?;

        let list: IndexList = HttpClient::parse(&text).map_err(|e| index_error("list indexes", &e))?;
        debug!("Pinecone project has {} indexes", list.indexes.len());
        Ok(list.indexes)
    }

    #[inline]
    pub fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let url = join(&self.controller_url, &format!("indexes/{}", name))?;
        let text = self
            .http
            .get(&url, &self.headers())
            .map_err(|e| index_error("describe index", &e))?;

        HttpClient::parse(&text).map_err(|e| index_error("describe index", &e))
    }

    #[inline]
    pub fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = join(&self.controller_url, "indexes")?;
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: &spec.metric,
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };

        self.http
            .post(&url, &self.headers(), &request)
            .map_err(|e| index_error("create index", &e))?;

        info!(
            "Created index {} ({} dimensions, {} metric, {}/{})",
            spec.name, spec.dimension, spec.metric, spec.cloud, spec.region
        );
        Ok(())
    }

    /// Create the index unless it already exists. Returns whether it was created.
    #[inline]
    pub fn ensure_index(&self, spec: &IndexSpec) -> Result<bool> {
        let exists = self
            .list_indexes()?
            .iter()
            .any(|index| index.name == spec.name);

        if exists {
            debug!("Index {} already exists", spec.name);
            return Ok(false);
        }

        self.create_index(spec)?;
        Ok(true)
    }

    /// Data-plane handle for the named index
    #[inline]
    pub fn index(&self, name: &str) -> Result<PineconeIndex> {
        let description = self.describe_index(name)?;
        let host = description.host.ok_or_else(|| {
            BotError::VectorIndex(format!("Index {} has no host yet; is it ready?", name))
        })?;

        Ok(PineconeIndex {
            host_url: host_url(&host)?,
            api_key: self.api_key.clone(),
            api_version: self.api_version.clone(),
            http: self.http.clone(),
        })
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("Api-Key", self.api_key.expose_secret().as_str()),
            ("X-Pinecone-API-Version", self.api_version.as_str()),
        ]
    }
}

/// Data-plane client bound to one index host
pub struct PineconeIndex {
    host_url: Url,
    api_key: SecretString,
    api_version: String,
    http: HttpClient,
}

impl PineconeIndex {
    #[inline]
    pub fn host(&self) -> &Url {
        &self.host_url
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("Api-Key", self.api_key.expose_secret().as_str()),
            ("X-Pinecone-API-Version", self.api_version.as_str()),
        ]
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = join(&self.host_url, "vectors/upsert")?;
        let text = self
            .http
            .post(&url, &self.headers(), &UpsertRequest { vectors: records })
            .map_err(|e| index_error("upsert", &e))?;

        let response: UpsertResponse =
            HttpClient::parse(&text).map_err(|e| index_error("upsert", &e))?;
        debug!("Upserted {} vectors", response.upserted_count);
        Ok(response.upserted_count)
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let url = join(&self.host_url, "query")?;
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let text = self
            .http
            .post(&url, &self.headers(), &request)
            .map_err(|e| index_error("query", &e))?;

        let response: QueryResponse =
            HttpClient::parse(&text).map_err(|e| index_error("query", &e))?;
        debug!("Query returned {} matches", response.matches.len());
        Ok(response.matches)
    }

    fn describe_stats(&self) -> Result<IndexStats> {
        let url = join(&self.host_url, "describe_index_stats")?;
        let text = self
            .http
            .post(&url, &self.headers(), &Map::new())
            .map_err(|e| index_error("describe index stats", &e))?;

        HttpClient::parse(&text).map_err(|e| index_error("describe index stats", &e))
    }
}

fn join(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| BotError::Config(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(path.split('/'));
    Ok(url)
}

fn host_url(host: &str) -> Result<Url> {
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    Url::parse(&with_scheme)
        .map_err(|e| BotError::VectorIndex(format!("Invalid index host {}: {}", host, e)))
}

fn index_error(operation: &str, err: &HttpError) -> BotError {
    match err {
        HttpError::Transport { .. } => {
            BotError::Network(format!("Failed to {}: {}", operation, err))
        }
        HttpError::Status {
            status: 401 | 403, ..
        } => BotError::VectorIndex(format!(
            "Failed to {}: the API key was rejected ({})",
            operation, err
        )),
        HttpError::Status { status: 404, .. } => BotError::VectorIndex(format!(
            "Failed to {}: index not found ({})",
            operation, err
        )),
        HttpError::Status { .. } | HttpError::Json(_) => {
            BotError::VectorIndex(format!("Failed to {}: {}", operation, err))
        }
    }
}
