use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::config::AuditConfig;
use crate::error::{ChromaError, Result};

/// Only the two health endpoints carry an explicit timeout; every other
/// call relies on the client default.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRef {
    pub name: String,
    pub id: String,
    pub metadata: serde_json::Map<String, Value>,
}

/// Which record fields a bulk retrieval should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInclude {
    pub documents: bool,
    pub metadatas: bool,
    pub embeddings: bool,
}

impl RecordInclude {
    pub const ALL: Self = Self {
        documents: true,
        metadatas: true,
        embeddings: true,
    };
    pub const DOCUMENTS: Self = Self {
        documents: true,
        metadatas: false,
        embeddings: false,
    };
    pub const METADATAS: Self = Self {
        documents: false,
        metadatas: true,
        embeddings: false,
    };

    fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.documents {
            fields.push("documents");
        }
        if self.metadatas {
            fields.push("metadatas");
        }
        if self.embeddings {
            fields.push("embeddings");
        }
        fields
    }
}

/// One page of records. Documents and metadata entries are per-record
/// nullable; embedding rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub ids: Vec<String>,
    pub documents: Option<Vec<Option<String>>>,
    pub metadatas: Option<Vec<Option<serde_json::Map<String, Value>>>>,
    pub embeddings: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub ids: Vec<String>,
    pub has_distances: bool,
}

/// Query surface of the Chroma service consumed by the audit pipeline.
pub trait ChromaApi {
    fn heartbeat(&self) -> Result<Value>;
    fn version(&self) -> Result<Value>;
    fn list_collections(&self) -> Result<Vec<CollectionRef>>;
    fn count(&self, collection: &CollectionRef) -> Result<u64>;
    fn get_records(
        &self,
        collection: &CollectionRef,
        limit: usize,
        include: RecordInclude,
    ) -> Result<RecordBatch>;
    fn query(&self, collection: &CollectionRef, text: &str, n_results: usize)
    -> Result<QueryOutcome>;
    fn filtered_get(
        &self,
        collection: &CollectionRef,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<RecordBatch>;
}

pub struct ChromaHttpClient {
    base_url: String,
    http: Client,
}

impl std::fmt::Debug for ChromaHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaHttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChromaHttpClient {
    pub fn new(config: &AuditConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: normalize_base_url(&config.base_url()),
            http,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    fn get_json(
        &self,
        operation: &'static str,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let mut request = self.http.get(self.api_url(path));
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let resp = request.send()?;
        if !resp.status().is_success() {
            return Err(ChromaError::Status {
                operation,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<Value>()?)
    }

    fn post_json(&self, operation: &'static str, path: &str, body: &Value) -> Result<Value> {
        let resp = self.http.post(self.api_url(path)).json(body).send()?;
        if !resp.status().is_success() {
            return Err(ChromaError::Status {
                operation,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<Value>()?)
    }
}

impl ChromaApi for ChromaHttpClient {
    fn heartbeat(&self) -> Result<Value> {
        self.get_json("heartbeat", "/heartbeat", Some(HEALTH_TIMEOUT))
    }

    fn version(&self) -> Result<Value> {
        self.get_json("version", "/version", Some(HEALTH_TIMEOUT))
    }

    fn list_collections(&self) -> Result<Vec<CollectionRef>> {
        let value = self.get_json("list_collections", "/collections", None)?;
        parse_collections(&value)
    }

    fn count(&self, collection: &CollectionRef) -> Result<u64> {
        let path = format!("/collections/{}/count", collection.id);
        let value = self.get_json("count", &path, None)?;
        parse_count(&value)
    }

    fn get_records(
        &self,
        collection: &CollectionRef,
        limit: usize,
        include: RecordInclude,
    ) -> Result<RecordBatch> {
        let path = format!("/collections/{}/get", collection.id);
        let body = json!({
            "limit": limit,
            "include": include.fields(),
        });
        let value = self.post_json("get_records", &path, &body)?;
        parse_record_batch(&value)
    }

    fn query(
        &self,
        collection: &CollectionRef,
        text: &str,
        n_results: usize,
    ) -> Result<QueryOutcome> {
        let path = format!("/collections/{}/query", collection.id);
        let body = json!({
            "query_texts": [text],
            "n_results": n_results.max(1),
        });
        let value = self.post_json("query", &path, &body)?;
        parse_query_outcome(&value)
    }

    fn filtered_get(
        &self,
        collection: &CollectionRef,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<RecordBatch> {
        let path = format!("/collections/{}/get", collection.id);
        let body = json!({
            "where": { key: value },
            "limit": limit,
        });
        let response = self.post_json("filtered_get", &path, &body)?;
        parse_record_batch(&response)
    }
}

pub(crate) fn parse_collections(value: &Value) -> Result<Vec<CollectionRef>> {
    let entries = value
        .as_array()
        .or_else(|| value.get("collections").and_then(|v| v.as_array()))
        .ok_or_else(|| {
            ChromaError::UnexpectedPayload("collection listing is not an array".to_string())
        })?;

    let mut collections = Vec::<CollectionRef>::new();
    for entry in entries {
        let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let id = entry
            .get("id")
            .map(render_scalar)
            .unwrap_or_else(|| name.to_string());
        let metadata = entry
            .get("metadata")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        collections.push(CollectionRef {
            name: name.to_string(),
            id,
            metadata,
        });
    }
    Ok(collections)
}

pub(crate) fn parse_count(value: &Value) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| value.get("count").and_then(|v| v.as_u64()))
        .ok_or_else(|| ChromaError::UnexpectedPayload("count is not an integer".to_string()))
}

pub(crate) fn parse_record_batch(value: &Value) -> Result<RecordBatch> {
    let ids = value
        .get("ids")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ChromaError::UnexpectedPayload("record batch has no ids".to_string()))?
        .iter()
        .map(render_scalar)
        .collect::<Vec<_>>();

    let documents = value.get("documents").and_then(|v| v.as_array()).map(|docs| {
        docs.iter()
            .map(|doc| doc.as_str().map(ToString::to_string))
            .collect::<Vec<_>>()
    });

    let metadatas = value.get("metadatas").and_then(|v| v.as_array()).map(|metas| {
        metas
            .iter()
            .map(|meta| meta.as_object().cloned())
            .collect::<Vec<_>>()
    });

    let embeddings = value.get("embeddings").and_then(|v| v.as_array()).map(|rows| {
        rows.iter()
            .map(|row| {
                row.as_array()
                    .map(|components| components.iter().filter_map(|c| c.as_f64()).collect())
                    .unwrap_or_default()
            })
            .collect::<Vec<Vec<f64>>>()
    });

    Ok(RecordBatch {
        ids,
        documents,
        metadatas,
        embeddings,
    })
}

pub(crate) fn parse_query_outcome(value: &Value) -> Result<QueryOutcome> {
    let ids = value
        .pointer("/ids/0")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ChromaError::UnexpectedPayload("query response has no ids".to_string()))?
        .iter()
        .map(render_scalar)
        .collect::<Vec<_>>();

    let has_distances = value
        .pointer("/distances/0")
        .and_then(|v| v.as_array())
        .is_some_and(|distances| !distances.is_empty());

    Ok(QueryOutcome { ids, has_distances })
}

/// String rendering shared by ids, metadata values, and filter samples.
/// Strings render bare; everything else renders as compact JSON.
pub(crate) fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
