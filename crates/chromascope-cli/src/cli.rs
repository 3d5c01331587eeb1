use std::path::PathBuf;

use chromascope_core::VectorAccounting;
use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "chromascope")]
#[command(about = "ChromaDB health and statistics reporter", version)]
pub struct Cli {
    /// Chroma service host (default: localhost, env: CHROMASCOPE_HOST).
    #[arg(long)]
    pub host: Option<String>,

    /// Chroma service port (default: 8000, env: CHROMASCOPE_PORT).
    #[arg(long)]
    pub port: Option<u16>,

    /// Write the full JSON report to this path.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Suppress the console summary.
    #[arg(long, default_value_t = false)]
    pub quiet: bool,

    /// Cap on records sampled per collection (default: 1000).
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// How the overview vector total is counted.
    #[arg(long, value_enum)]
    pub vector_accounting: Option<VectorAccountingArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VectorAccountingArg {
    /// Assume one vector per counted document.
    AssumedParity,
    /// Sum only embeddings actually retrieved during sampling.
    Sampled,
}

impl From<VectorAccountingArg> for VectorAccounting {
    fn from(arg: VectorAccountingArg) -> Self {
        match arg {
            VectorAccountingArg::AssumedParity => VectorAccounting::AssumedParity,
            VectorAccountingArg::Sampled => VectorAccounting::Sampled,
        }
    }
}
