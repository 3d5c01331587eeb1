mod cli;
mod commands;
mod summary;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match commands::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("chromascope: {err:#}");
            ExitCode::FAILURE
        }
    }
}
