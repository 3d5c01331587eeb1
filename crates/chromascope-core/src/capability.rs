use crate::chroma::{ChromaApi, CollectionRef, RecordInclude};
use crate::models::{CapabilityReport, EqualityFilter, FilterProbe, SearchProbe};

const QUERY_TEXT_LIMIT: usize = 100;
const PROBE_RESULT_LIMIT: usize = 5;

/// Exercises the collection's query surface with data drawn from the
/// collection itself. Empty collections are skipped outright; the two
/// sub-probes run independently and capture their own failures.
pub fn probe_capabilities(
    api: &dyn ChromaApi,
    collection: &CollectionRef,
    count: u64,
) -> CapabilityReport {
    if count == 0 {
        return CapabilityReport::skipped("empty collection");
    }

    CapabilityReport::Probed {
        similarity_search: similarity_probe(api, collection, count),
        metadata_filter: filter_probe(api, collection),
    }
}

fn similarity_probe(api: &dyn ChromaApi, collection: &CollectionRef, count: u64) -> SearchProbe {
    let sample = match api.get_records(collection, 1, RecordInclude::DOCUMENTS) {
        Ok(batch) => batch,
        Err(err) => {
            return SearchProbe {
                success: false,
                query_text: None,
                results_count: None,
                has_distances: None,
                reason: None,
                error: Some((&err).into()),
            };
        }
    };

    let sample_text = sample
        .documents
        .as_ref()
        .and_then(|documents| documents.first())
        .and_then(|document| document.as_deref())
        .filter(|text| !text.is_empty());
    let Some(text) = sample_text else {
        return SearchProbe {
            success: false,
            query_text: None,
            results_count: None,
            has_distances: None,
            reason: Some("no sample document available".to_string()),
            error: None,
        };
    };

    let query_text = truncate_chars(text, QUERY_TEXT_LIMIT);
    let n_results = count.min(PROBE_RESULT_LIMIT as u64) as usize;
    match api.query(collection, &query_text, n_results) {
        Ok(outcome) => SearchProbe {
            success: true,
            query_text: Some(query_text),
            results_count: Some(outcome.ids.len()),
            has_distances: Some(outcome.has_distances),
            reason: None,
            error: None,
        },
        Err(err) => SearchProbe {
            success: false,
            query_text: Some(query_text),
            results_count: None,
            has_distances: None,
            reason: None,
            error: Some((&err).into()),
        },
    }
}

fn filter_probe(api: &dyn ChromaApi, collection: &CollectionRef) -> FilterProbe {
    let sample = match api.get_records(collection, 1, RecordInclude::METADATAS) {
        Ok(batch) => batch,
        Err(err) => {
            return FilterProbe {
                success: false,
                filter: None,
                results_count: None,
                reason: None,
                error: Some((&err).into()),
            };
        }
    };

    let mapping = sample
        .metadatas
        .as_ref()
        .and_then(|metadatas| metadatas.first())
        .and_then(|metadata| metadata.as_ref())
        .filter(|mapping| !mapping.is_empty());
    // Lexicographically smallest key, so the probe is reproducible across
    // runs regardless of the service's mapping order.
    let selected = mapping.and_then(|mapping| {
        mapping
            .keys()
            .min()
            .and_then(|key| mapping.get(key).map(|value| (key.clone(), value.clone())))
    });
    let Some((key, value)) = selected else {
        return FilterProbe {
            success: false,
            filter: None,
            results_count: None,
            reason: Some("no metadata available".to_string()),
            error: None,
        };
    };

    let filter = EqualityFilter {
        key: key.clone(),
        value: value.clone(),
    };
    match api.filtered_get(collection, &key, &value, PROBE_RESULT_LIMIT) {
        Ok(batch) => FilterProbe {
            success: true,
            filter: Some(filter),
            results_count: Some(batch.ids.len()),
            reason: None,
            error: None,
        },
        Err(err) => FilterProbe {
            success: false,
            filter: Some(filter),
            results_count: None,
            reason: None,
            error: Some((&err).into()),
        },
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
