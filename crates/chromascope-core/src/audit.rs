use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::analysis::analyze_collection;
use crate::capability::probe_capabilities;
use crate::chroma::{ChromaApi, CollectionRef};
use crate::config::{AuditConfig, VectorAccounting};
use crate::error::{ChromaError, SectionError};
use crate::models::{
    AnalysisStatus, CollectionAnalysis, CollectionSummary, ConnectionReport, ConnectionState,
    Overview, Report,
};
use crate::probe::{check_health, probe_connection};

/// Runs the full audit pipeline sequentially: connection probe, health
/// probes, enumeration, then per-collection analysis and capability
/// probes in enumeration order. Always returns a well-formed report; a
/// failed connection short-circuits everything downstream.
pub fn run_audit(api: &dyn ChromaApi, config: &AuditConfig) -> Report {
    let connection = probe_connection(api, config);
    if connection.status != ConnectionState::Connected {
        return assemble(connection, None, None, BTreeMap::new());
    }

    let health = check_health(api);
    let (mut overview, enumerated) = collections_overview(api, config);

    let mut collections = BTreeMap::<String, CollectionAnalysis>::new();
    for (collection, counted) in enumerated {
        let analysis = match counted {
            Ok(count) => {
                let mut analysis =
                    analyze_collection(api, &collection, count, config.sample_limit);
                analysis.capabilities = Some(probe_capabilities(api, &collection, count));
                analysis
            }
            Err(error) => uncounted_analysis(&collection, error),
        };
        collections.insert(collection.name.clone(), analysis);
    }

    if config.vector_accounting == VectorAccounting::Sampled {
        overview.total_vectors = collections
            .values()
            .filter_map(|analysis| analysis.embeddings.as_ref())
            .map(|embeddings| embeddings.total_vectors as u64)
            .sum();
    }

    assemble(connection, Some(health), Some(overview), collections)
}

/// Report emitted when no client could even be constructed.
pub fn failed_report(config: &AuditConfig, err: &ChromaError) -> Report {
    let connection = ConnectionReport {
        status: ConnectionState::Failed,
        host: config.host.clone(),
        port: config.port,
        url: config.base_url(),
        error: Some(err.into()),
    };
    assemble(connection, None, None, BTreeMap::new())
}

type CountedCollections = Vec<(CollectionRef, std::result::Result<u64, SectionError>)>;

/// Lists collections and counts each one. A count failure lands in that
/// collection's summary slot and never aborts enumeration of siblings.
pub fn collections_overview(
    api: &dyn ChromaApi,
    config: &AuditConfig,
) -> (Overview, CountedCollections) {
    let listed = match api.list_collections() {
        Ok(listed) => listed,
        Err(err) => {
            let mut overview = empty_overview(config);
            overview.error = Some((&err).into());
            return (overview, Vec::new());
        }
    };

    let mut summaries = Vec::<CollectionSummary>::new();
    let mut enumerated = CountedCollections::new();
    let mut total_documents = 0u64;
    for collection in listed {
        match api.count(&collection) {
            Ok(count) => {
                total_documents += count;
                summaries.push(CollectionSummary {
                    name: collection.name.clone(),
                    id: collection.id.clone(),
                    metadata: collection.metadata.clone(),
                    document_count: Some(count),
                    error: None,
                });
                enumerated.push((collection, Ok(count)));
            }
            Err(err) => {
                let error = SectionError::from(&err);
                summaries.push(CollectionSummary {
                    name: collection.name.clone(),
                    id: collection.id.clone(),
                    metadata: collection.metadata.clone(),
                    document_count: None,
                    error: Some(error.clone()),
                });
                enumerated.push((collection, Err(error)));
            }
        }
    }

    let total_vectors = match config.vector_accounting {
        // Historical parity assumption: one vector per counted document.
        VectorAccounting::AssumedParity => total_documents,
        // Replaced after analysis with the sampled embedding total.
        VectorAccounting::Sampled => 0,
    };

    let overview = Overview {
        total_collections: summaries.len(),
        collection_names: summaries.iter().map(|summary| summary.name.clone()).collect(),
        collections: summaries,
        total_documents,
        total_vectors,
        vector_accounting: config.vector_accounting,
        error: None,
    };
    (overview, enumerated)
}

fn uncounted_analysis(collection: &CollectionRef, error: SectionError) -> CollectionAnalysis {
    CollectionAnalysis {
        name: collection.name.clone(),
        id: collection.id.clone(),
        metadata: collection.metadata.clone(),
        status: AnalysisStatus::Failed,
        document_count: None,
        documents: None,
        embeddings: None,
        metadata_stats: None,
        data_retrieval_error: None,
        capabilities: None,
        error: Some(error),
    }
}

fn empty_overview(config: &AuditConfig) -> Overview {
    Overview {
        total_collections: 0,
        collection_names: Vec::new(),
        collections: Vec::new(),
        total_documents: 0,
        total_vectors: 0,
        vector_accounting: config.vector_accounting,
        error: None,
    }
}

fn assemble(
    connection: ConnectionReport,
    health: Option<crate::models::HealthReport>,
    overview: Option<Overview>,
    collections: BTreeMap<String, CollectionAnalysis>,
) -> Report {
    Report {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        connection,
        health,
        overview,
        collections,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::CapabilityReport;
    use crate::testing::{FakeCollection, FakeStore, metadata_map};

    fn two_collection_store() -> FakeStore {
        FakeStore::with_collections(vec![
            FakeCollection::empty("archive"),
            FakeCollection::with_records(
                "news",
                &[Some("alpha body"), Some("beta body"), Some("gamma body")],
                &[
                    Some(metadata_map(&[("lang", json!("en"))])),
                    Some(metadata_map(&[("lang", json!("en"))])),
                    None,
                ],
            ),
        ])
    }

    #[test]
    fn empty_and_populated_collections_are_both_reported() {
        let store = two_collection_store();
        let report = run_audit(&store, &AuditConfig::default());

        let archive = &report.collections["archive"];
        assert_eq!(archive.status, AnalysisStatus::Empty);
        assert!(matches!(
            archive.capabilities,
            Some(CapabilityReport::Skipped { .. })
        ));

        let news = &report.collections["news"];
        assert_eq!(news.document_count, Some(3));
        let documents = news.documents.as_ref().expect("documents");
        assert_eq!(documents.samples.len(), 3);
        assert_eq!(documents.document_lengths.len(), 3);
    }

    #[test]
    fn connection_failure_short_circuits_but_still_emits_report() {
        let store = FakeStore {
            heartbeat_ok_calls: 0,
            ..FakeStore::default()
        };

        let report = run_audit(&store, &AuditConfig::default());
        assert_eq!(report.connection.status, ConnectionState::Failed);
        assert!(report.health.is_none());
        assert!(report.overview.is_none());
        assert!(report.collections.is_empty());
        assert_eq!(store.calls(), vec!["heartbeat".to_string()]);
    }

    #[test]
    fn health_probe_failure_does_not_stop_enumeration() {
        // First heartbeat (connection probe) succeeds, the health probe
        // heartbeat fails, version succeeds.
        let mut store = two_collection_store();
        store.heartbeat_ok_calls = 1;

        let report = run_audit(&store, &AuditConfig::default());
        assert_eq!(report.connection.status, ConnectionState::Connected);
        let health = report.health.expect("health");
        assert!(!health.heartbeat.success);
        assert!(health.version.success);
        assert_eq!(report.overview.expect("overview").total_collections, 2);
    }

    #[test]
    fn one_collection_retrieval_failure_leaves_siblings_populated() {
        let mut broken = FakeCollection::with_documents("broken", &[Some("doc")]);
        broken.fail_get = true;
        let store = FakeStore::with_collections(vec![
            broken,
            FakeCollection::with_documents("healthy", &[Some("doc")]),
        ]);

        let report = run_audit(&store, &AuditConfig::default());
        assert!(report.collections["broken"].data_retrieval_error.is_some());
        assert!(report.collections["healthy"].documents.is_some());
    }

    #[test]
    fn count_failure_is_isolated_to_its_summary_slot() {
        let mut uncountable = FakeCollection::with_documents("uncountable", &[Some("doc")]);
        uncountable.fail_count = true;
        let store = FakeStore::with_collections(vec![
            uncountable,
            FakeCollection::with_documents("fine", &[Some("doc"), Some("other")]),
        ]);

        let report = run_audit(&store, &AuditConfig::default());
        let overview = report.overview.expect("overview");
        assert_eq!(overview.total_collections, 2);
        assert_eq!(overview.total_documents, 2);
        let slot = &overview.collections[0];
        assert_eq!(slot.name, "uncountable");
        assert!(slot.document_count.is_none());
        assert_eq!(slot.error.as_ref().expect("error").code, "HTTP_STATUS");

        let failed = &report.collections["uncountable"];
        assert_eq!(failed.status, AnalysisStatus::Failed);
        assert!(failed.error.is_some());
        assert!(report.collections["fine"].documents.is_some());
    }

    #[test]
    fn listing_failure_yields_error_overview_and_no_collections() {
        let store = FakeStore {
            fail_list: true,
            ..FakeStore::default()
        };

        let report = run_audit(&store, &AuditConfig::default());
        let overview = report.overview.expect("overview");
        assert_eq!(overview.total_collections, 0);
        assert!(overview.error.is_some());
        assert!(report.collections.is_empty());
        assert!(report.health.is_some());
    }

    #[test]
    fn assumed_parity_mirrors_document_totals() {
        let store = two_collection_store();
        let report = run_audit(&store, &AuditConfig::default());
        let overview = report.overview.expect("overview");
        assert_eq!(overview.total_documents, 3);
        assert_eq!(overview.total_vectors, 3);
    }

    #[test]
    fn sampled_accounting_sums_retrieved_embeddings_only() {
        let mut with_vectors = FakeCollection::with_documents("vectors", &[Some("a"), Some("b")]);
        with_vectors.embeddings = Some(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        let store = FakeStore::with_collections(vec![
            with_vectors,
            FakeCollection::with_documents("plain", &[Some("c")]),
        ]);
        let config = AuditConfig {
            vector_accounting: VectorAccounting::Sampled,
            ..AuditConfig::default()
        };

        let report = run_audit(&store, &config);
        let overview = report.overview.expect("overview");
        assert_eq!(overview.total_documents, 3);
        assert_eq!(overview.total_vectors, 2);
        assert_eq!(overview.vector_accounting, VectorAccounting::Sampled);
    }

    #[test]
    fn failed_report_is_well_formed() {
        let config = AuditConfig::default();
        let err = ChromaError::InvalidEndpoint("bad host".to_string());

        let report = failed_report(&config, &err);
        assert_eq!(report.connection.status, ConnectionState::Failed);
        assert_eq!(
            report.connection.error.expect("error").code,
            "INVALID_ENDPOINT"
        );
        assert!(report.collections.is_empty());
    }

    #[test]
    fn report_round_trips_through_serialized_file() {
        let store = two_collection_store();
        let report = run_audit(&store, &AuditConfig::default());

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        std::fs::write(
            &path,
            serde_json::to_string_pretty(&report).expect("serialize"),
        )
        .expect("write");

        let raw = std::fs::read_to_string(&path).expect("read");
        let restored: Report = serde_json::from_str(&raw).expect("deserialize");

        assert_eq!(restored.run_id, report.run_id);
        assert_eq!(restored.connection.status, ConnectionState::Connected);
        let overview = restored.overview.expect("overview");
        assert_eq!(overview.collection_names, vec!["archive", "news"]);
        assert_eq!(overview.total_documents, 3);
        assert_eq!(
            restored.collections.keys().collect::<Vec<_>>(),
            vec!["archive", "news"]
        );
        assert_eq!(restored.collections["news"].document_count, Some(3));
        assert_eq!(restored.collections["archive"].status, AnalysisStatus::Empty);
    }
}
