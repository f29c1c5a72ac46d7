//! Season Patch - idempotent schema patch for `player_season_stats`
//!
//! Renames the legacy shot columns, adds the per-season stat columns and the
//! `(team_id, season)` index. Safe to re-run against any prior state.

mod config;
mod database;
mod prelude;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();

  // Initialize tracing
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "season_patch=info,migration=info,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = match Config::from_env() {
    Ok(config) => config,
    Err(err) => {
      error!("Configuration error: {err:#}");
      return ExitCode::FAILURE;
    }
  };

  info!("Starting Season Patch v{}", env!("CARGO_PKG_VERSION"));

  match database::run(&config).await {
    Ok(report) if report.dry_run => {
      info!("Dry run finished, {} operations pending", report.planned());
      ExitCode::SUCCESS
    }
    Ok(report) if report.is_noop() => {
      info!("Schema already up to date");
      ExitCode::SUCCESS
    }
    Ok(report) => {
      info!("Schema patched, {} operations applied", report.applied());
      ExitCode::SUCCESS
    }
    Err(err) => {
      error!("Patch aborted: {err}");
      ExitCode::from(database::exit_code(&err))
    }
  }
}
