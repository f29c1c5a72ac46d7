//! Runtime configuration, read from the environment (and `.env`)

use std::env;

use crate::prelude::*;

const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  /// Patch document to apply instead of the built-in one.
  pub patch_file: Option<PathBuf>,
  pub dry_run: bool,
  pub acquire_timeout: Duration,
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    let var = |key: &str| {
      lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    };

    let database_url = var("DATABASE_URL").context("DATABASE_URL not set")?;
    let patch_file = var("PATCH_FILE").map(PathBuf::from);

    let dry_run = match var("PATCH_DRY_RUN") {
      Some(value) => parse_flag(&value)
        .with_context(|| format!("Invalid PATCH_DRY_RUN: {value}"))?,
      None => false,
    };

    let acquire_timeout = match var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
      Some(value) => value.parse().with_context(|| {
        format!("Invalid DATABASE_ACQUIRE_TIMEOUT_SECS: {value}")
      })?,
      None => DEFAULT_ACQUIRE_TIMEOUT_SECS,
    };

    Ok(Self {
      database_url,
      patch_file,
      dry_run,
      acquire_timeout: Duration::from_secs(acquire_timeout),
    })
  }

  pub fn patch(&self) -> migration::Result<Patch> {
    match &self.patch_file {
      Some(path) => Patch::load(path),
      None => Patch::builtin(),
    }
  }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
  match value.to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => bail!("expected a boolean flag"),
  }
}
