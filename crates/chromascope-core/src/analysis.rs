use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::chroma::{ChromaApi, CollectionRef, RecordInclude, render_scalar};
use crate::models::{
    AnalysisStatus, CollectionAnalysis, DocumentStats, EmbeddingStats, KeyFrequency,
    MetadataFieldStats, MetadataStats, VectorDistribution,
};

const DOCUMENT_SAMPLE_LIMIT: usize = 5;
const VECTOR_SAMPLE_COMPONENTS: usize = 10;
const METADATA_SAMPLE_LIMIT: usize = 3;
const VALUE_SAMPLE_LIMIT: usize = 5;
const COMMON_KEY_LIMIT: usize = 10;

/// Analyzes one collection from a bounded sample of its records.
///
/// Empty collections short-circuit without any retrieval call. A retrieval
/// failure is recorded on the analysis, which is still returned with the
/// identity fields already known. The three sub-analyses are independent:
/// none of them can suppress another.
pub fn analyze_collection(
    api: &dyn ChromaApi,
    collection: &CollectionRef,
    count: u64,
    sample_limit: usize,
) -> CollectionAnalysis {
    let mut analysis = CollectionAnalysis {
        name: collection.name.clone(),
        id: collection.id.clone(),
        metadata: collection.metadata.clone(),
        status: AnalysisStatus::Analyzed,
        document_count: Some(count),
        documents: None,
        embeddings: None,
        metadata_stats: None,
        data_retrieval_error: None,
        capabilities: None,
        error: None,
    };

    if count == 0 {
        analysis.status = AnalysisStatus::Empty;
        return analysis;
    }

    let limit = count.min(sample_limit as u64) as usize;
    match api.get_records(collection, limit, RecordInclude::ALL) {
        Ok(batch) => {
            if let Some(documents) = &batch.documents {
                analysis.documents = Some(document_stats(documents));
            }
            if let Some(embeddings) = batch.embeddings.as_deref().filter(|rows| !rows.is_empty()) {
                analysis.embeddings = Some(embedding_stats(embeddings));
            }
            if let Some(metadatas) = &batch.metadatas {
                analysis.metadata_stats = metadata_stats(metadatas);
            }
        }
        Err(err) => analysis.data_retrieval_error = Some((&err).into()),
    }

    analysis
}

/// Per-document lengths, mean length, and empty count over the sample.
/// Absent or null bodies count as length zero.
pub(crate) fn document_stats(documents: &[Option<String>]) -> DocumentStats {
    let document_lengths = documents
        .iter()
        .map(|doc| doc.as_ref().map_or(0, |text| text.chars().count()))
        .collect::<Vec<_>>();
    let empty_documents = document_lengths.iter().filter(|len| **len == 0).count();
    let avg_document_length = if document_lengths.is_empty() {
        0.0
    } else {
        document_lengths.iter().sum::<usize>() as f64 / document_lengths.len() as f64
    };

    DocumentStats {
        total_analyzed: documents.len(),
        sample_count: documents.len().min(DOCUMENT_SAMPLE_LIMIT),
        samples: documents.iter().take(DOCUMENT_SAMPLE_LIMIT).cloned().collect(),
        document_lengths,
        avg_document_length,
        empty_documents,
    }
}

/// Pooled scalar statistics across all components of all vectors, plus a
/// truncated sample of the first vector. Dimensionality is the shared row
/// width, 0 when rows disagree.
pub(crate) fn embedding_stats(embeddings: &[Vec<f64>]) -> EmbeddingStats {
    let vector_dimensions = match embeddings.first() {
        Some(first) if embeddings.iter().all(|row| row.len() == first.len()) => first.len(),
        _ => 0,
    };

    let sample_vector = embeddings
        .first()
        .map(|row| row.iter().take(VECTOR_SAMPLE_COMPONENTS).copied().collect())
        .unwrap_or_default();

    EmbeddingStats {
        total_vectors: embeddings.len(),
        vector_dimensions,
        statistics: pooled_distribution(embeddings),
        sample_vector,
    }
}

fn pooled_distribution(embeddings: &[Vec<f64>]) -> Option<VectorDistribution> {
    let total = embeddings.iter().map(Vec::len).sum::<usize>();
    if total == 0 {
        return None;
    }

    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for component in embeddings.iter().flatten() {
        sum += component;
        min = min.min(*component);
        max = max.max(*component);
    }
    let mean = sum / total as f64;

    let variance = embeddings
        .iter()
        .flatten()
        .map(|component| (component - mean).powi(2))
        .sum::<f64>()
        / total as f64;

    Some(VectorDistribution {
        mean,
        std: variance.sqrt(),
        min,
        max,
    })
}

/// Field-level statistics over all non-empty metadata mappings in the
/// sample. Returns `None` when no record carries metadata.
pub(crate) fn metadata_stats(
    metadatas: &[Option<serde_json::Map<String, Value>>],
) -> Option<MetadataStats> {
    let present = metadatas
        .iter()
        .flatten()
        .filter(|mapping| !mapping.is_empty())
        .collect::<Vec<_>>();
    if present.is_empty() {
        return None;
    }

    let mut frequencies = BTreeMap::<&str, usize>::new();
    for mapping in &present {
        for key in mapping.keys() {
            *frequencies.entry(key.as_str()).or_insert(0) += 1;
        }
    }

    let mut common_keys = frequencies
        .iter()
        .map(|(key, count)| KeyFrequency {
            key: (*key).to_string(),
            count: *count,
        })
        .collect::<Vec<_>>();
    common_keys.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    common_keys.truncate(COMMON_KEY_LIMIT);

    let mut fields = BTreeMap::<String, MetadataFieldStats>::new();
    for (key, frequency) in &frequencies {
        let values = present
            .iter()
            .filter_map(|mapping| mapping.get(*key))
            .collect::<Vec<_>>();

        let mut value_types = BTreeMap::<String, usize>::new();
        for value in values.iter().copied() {
            *value_types
                .entry(value_type_name(value).to_string())
                .or_insert(0) += 1;
        }

        let rendered = values
            .iter()
            .copied()
            .map(render_scalar)
            .collect::<BTreeSet<_>>();

        fields.insert(
            (*key).to_string(),
            MetadataFieldStats {
                frequency: *frequency,
                unique_values: rendered.len(),
                value_types,
                sample_values: rendered.into_iter().take(VALUE_SAMPLE_LIMIT).collect(),
            },
        );
    }

    Some(MetadataStats {
        total_with_metadata: present.len(),
        common_keys,
        fields,
        sample_metadata: present
            .iter()
            .take(METADATA_SAMPLE_LIMIT)
            .map(|mapping| (*mapping).clone())
            .collect(),
    })
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
