use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chromascope_core::{
    AuditConfig, ChromaHttpClient, ConnectionState, failed_report, run_audit,
};

use crate::cli::Cli;
use crate::summary;

pub(crate) fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli);
    if !cli.quiet {
        println!("auditing {}", config.base_url());
    }

    let report = match ChromaHttpClient::new(&config) {
        Ok(client) => run_audit(&client, &config),
        Err(err) => failed_report(&config, &err),
    };

    if !cli.quiet {
        summary::print_summary(&report);
    }

    if let Some(path) = &cli.output {
        let serialized = serde_json::to_string_pretty(&report).context("serialize report")?;
        fs::write(path, serialized)
            .with_context(|| format!("write report to {}", path.display()))?;
        if !cli.quiet {
            println!("report saved to {}", path.display());
        }
    }

    Ok(match report.connection.status {
        ConnectionState::Connected => ExitCode::SUCCESS,
        ConnectionState::Failed => ExitCode::FAILURE,
    })
}

/// Environment overrides first, explicit flags win.
fn resolve_config(cli: &Cli) -> AuditConfig {
    let mut config = AuditConfig::from_env();
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(limit) = cli.sample_limit {
        config.sample_limit = limit.max(1);
    }
    if let Some(accounting) = cli.vector_accounting {
        config.vector_accounting = accounting.into();
    }
    config
}
