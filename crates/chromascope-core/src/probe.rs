use std::time::Instant;

use serde_json::Value;

use crate::chroma::ChromaApi;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::models::{ConnectionReport, ConnectionState, HealthProbe, HealthReport};

/// Verifies reachability with a single liveness call. A failure here is
/// the one fatal condition: the pipeline skips everything downstream
/// except report emission.
pub fn probe_connection(api: &dyn ChromaApi, config: &AuditConfig) -> ConnectionReport {
    let (status, error) = match api.heartbeat() {
        Ok(_) => (ConnectionState::Connected, None),
        Err(err) => (ConnectionState::Failed, Some((&err).into())),
    };
    ConnectionReport {
        status,
        host: config.host.clone(),
        port: config.port,
        url: config.base_url(),
        error,
    }
}

/// Issues the heartbeat and version probes independently; neither failure
/// blocks the other or anything downstream.
pub fn check_health(api: &dyn ChromaApi) -> HealthReport {
    HealthReport {
        heartbeat: run_probe(|| api.heartbeat()),
        version: run_probe(|| api.version()),
    }
}

fn run_probe(call: impl FnOnce() -> Result<Value>) -> HealthProbe {
    let started = Instant::now();
    let outcome = call();
    let latency_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
    match outcome {
        Ok(payload) => HealthProbe {
            success: true,
            latency_ms,
            payload: Some(payload),
            error: None,
        },
        Err(err) => HealthProbe {
            success: false,
            latency_ms,
            payload: None,
            error: Some((&err).into()),
        },
    }
}
