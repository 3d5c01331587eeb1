// Public fallible APIs in this crate share one concrete error contract (`ChromaError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod analysis;
pub mod audit;
pub mod capability;
pub mod chroma;
pub mod config;
pub mod error;
pub mod models;
pub mod probe;

#[cfg(test)]
pub(crate) mod testing;

pub use audit::{collections_overview, failed_report, run_audit};
pub use chroma::{ChromaApi, ChromaHttpClient};
pub use config::{AuditConfig, VectorAccounting};
pub use error::{ChromaError, Result, SectionError};
pub use models::{ConnectionState, Report};
