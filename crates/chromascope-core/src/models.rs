use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::VectorAccounting;
use crate::error::SectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub status: ConnectionState,
    pub host: String,
    pub port: u16,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

/// One liveness/version probe. Latency covers request dispatch to full
/// response, in milliseconds, and is recorded for failures too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthProbe {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub heartbeat: HealthProbe,
    pub version: HealthProbe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub total_collections: usize,
    pub collection_names: Vec<String>,
    pub collections: Vec<CollectionSummary>,
    pub total_documents: u64,
    pub total_vectors: u64,
    pub vector_accounting: VectorAccounting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_analyzed: usize,
    pub sample_count: usize,
    /// First few documents verbatim; absent bodies stay null.
    pub samples: Vec<Option<String>>,
    pub document_lengths: Vec<usize>,
    pub avg_document_length: f64,
    pub empty_documents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDistribution {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingStats {
    pub total_vectors: usize,
    /// Row width of the retrieved vector list; 0 when ragged or empty.
    pub vector_dimensions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<VectorDistribution>,
    pub sample_vector: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFrequency {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFieldStats {
    pub frequency: usize,
    pub unique_values: usize,
    pub value_types: BTreeMap<String, usize>,
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataStats {
    pub total_with_metadata: usize,
    /// Most frequent keys, descending; ties break lexicographically.
    pub common_keys: Vec<KeyFrequency>,
    pub fields: BTreeMap<String, MetadataFieldStats>,
    pub sample_metadata: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProbe {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_distances: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualityFilter {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterProbe {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<EqualityFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityReport {
    Skipped {
        status: String,
        reason: String,
    },
    Probed {
        similarity_search: SearchProbe,
        metadata_filter: FilterProbe,
    },
}

impl CapabilityReport {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            status: "skipped".to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Empty,
    Analyzed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionAnalysis {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<DocumentStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<EmbeddingStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_stats: Option<MetadataStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_retrieval_error: Option<SectionError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<CapabilityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SectionError>,
}

/// Root object for one audit run. Assembled once, never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub connection: ConnectionReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<Overview>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, CollectionAnalysis>,
}
