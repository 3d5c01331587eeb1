use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;

const ENV_HOST: &str = "CHROMASCOPE_HOST";
const ENV_PORT: &str = "CHROMASCOPE_PORT";
const ENV_SAMPLE_LIMIT: &str = "CHROMASCOPE_SAMPLE_LIMIT";
const ENV_VECTOR_ACCOUNTING: &str = "CHROMASCOPE_VECTOR_ACCOUNTING";

/// How the overview `total_vectors` aggregate is produced.
///
/// `AssumedParity` mirrors the historical report: every counted document is
/// assumed to carry exactly one vector. `Sampled` drops that assumption and
/// sums only embeddings actually retrieved during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorAccounting {
    AssumedParity,
    Sampled,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub host: String,
    pub port: u16,
    pub sample_limit: usize,
    pub vector_accounting: VectorAccounting,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            vector_accounting: VectorAccounting::AssumedParity,
        }
    }
}

impl AuditConfig {
    /// Defaults overlaid with any `CHROMASCOPE_*` environment overrides.
    pub fn from_env() -> Self {
        Self {
            host: resolve_host(read_non_empty_env(ENV_HOST).as_deref()),
            port: resolve_port(read_non_empty_env(ENV_PORT).as_deref()),
            sample_limit: resolve_sample_limit(read_non_empty_env(ENV_SAMPLE_LIMIT).as_deref()),
            vector_accounting: resolve_vector_accounting(
                read_non_empty_env(ENV_VECTOR_ACCOUNTING).as_deref(),
            ),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[must_use]
pub fn resolve_host(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_HOST.to_string(),
    }
}

#[must_use]
pub fn resolve_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[must_use]
pub fn resolve_sample_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(DEFAULT_SAMPLE_LIMIT)
}

#[must_use]
pub fn resolve_vector_accounting(raw: Option<&str>) -> VectorAccounting {
    match raw.map(|value| value.trim().to_ascii_lowercase()) {
        Some(value) if value == "sampled" => VectorAccounting::Sampled,
        _ => VectorAccounting::AssumedParity,
    }
}

#[must_use]
fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}
