use chromascope_core::Report;
use chromascope_core::models::{
    AnalysisStatus, CapabilityReport, CollectionAnalysis, ConnectionState, HealthProbe,
};

/// Console rendering of the report. Degrades gracefully: sections that
/// failed print their error codes instead of aborting the summary.
pub(crate) fn print_summary(report: &Report) {
    let connected = report.connection.status == ConnectionState::Connected;
    println!("connection {} {}", glyph(connected), report.connection.url);
    if let Some(error) = &report.connection.error {
        println!("  {}: {}", error.code, error.message);
    }

    if let Some(health) = &report.health {
        print_probe("heartbeat", &health.heartbeat);
        print_probe("version", &health.version);
    }

    if let Some(overview) = &report.overview {
        println!(
            "overview   {} collections, {} documents, {} vectors",
            overview.total_collections, overview.total_documents, overview.total_vectors
        );
        if let Some(error) = &overview.error {
            println!("  {}: {}", error.code, error.message);
        }
    }

    for (name, analysis) in &report.collections {
        print_collection(name, analysis);
    }

    println!(
        "run {} finished at {}",
        report.run_id,
        report.generated_at.to_rfc3339()
    );
}

fn print_probe(label: &str, probe: &HealthProbe) {
    let latency = probe
        .latency_ms
        .map(|ms| format!(" {ms:.1}ms"))
        .unwrap_or_default();
    println!("{label:<10} {}{latency}", glyph(probe.success));
    if let Some(error) = &probe.error {
        println!("  {}: {}", error.code, error.message);
    }
}

fn print_collection(name: &str, analysis: &CollectionAnalysis) {
    match analysis.status {
        AnalysisStatus::Empty => {
            println!("  {name}: empty");
            return;
        }
        AnalysisStatus::Failed => {
            let code = analysis
                .error
                .as_ref()
                .map_or("UNKNOWN", |error| error.code.as_str());
            println!("  {name}: ❌ {code}");
            return;
        }
        AnalysisStatus::Analyzed => {}
    }

    let count = analysis.document_count.unwrap_or(0);
    let mut line = format!("  {name}: {count} documents");
    if let Some(documents) = &analysis.documents {
        line.push_str(&format!(", avg length {:.1}", documents.avg_document_length));
    }
    if let Some(embeddings) = &analysis.embeddings {
        line.push_str(&format!(", {} dims", embeddings.vector_dimensions));
    }
    if let Some(CapabilityReport::Probed {
        similarity_search,
        metadata_filter,
    }) = &analysis.capabilities
    {
        line.push_str(&format!(", search {}", glyph(similarity_search.success)));
        line.push_str(&format!(", filter {}", glyph(metadata_filter.success)));
    }
    println!("{line}");

    if let Some(error) = &analysis.data_retrieval_error {
        println!("    retrieval {}: {}", error.code, error.message);
    }
}

fn glyph(success: bool) -> &'static str {
    if success { "✅" } else { "❌" }
}
