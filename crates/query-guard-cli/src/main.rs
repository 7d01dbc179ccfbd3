#![cfg_attr(test, allow(unused_crate_dependencies))]

use std::process::ExitCode;

use clap::crate_version;
use query_guard::QueryGuardBuilder;

mod args;
mod logging;

fn main() -> anyhow::Result<ExitCode> {
    let args = args::parse();
    logging::init(&args);

    let crate_version = crate_version!();
    tracing::info!("Query guard {crate_version}");

    let config = args.config()?;
    let query = args.query()?;
    let variables = args.variables()?;

    let guard = QueryGuardBuilder::from(&config).finish();

    match guard.validate(&query, args.operation_name.as_deref(), &variables) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::warn!("Operation rejected");
            eprintln!("{error}");
            Ok(ExitCode::FAILURE)
        }
    }
}
