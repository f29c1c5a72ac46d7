use crate::prelude::*;

/// Opens the single connection the patch runs on.
pub async fn connect(config: &Config) -> migration::Result<DatabaseConnection> {
  let mut options = ConnectOptions::new(config.database_url.clone());
  options
    .max_connections(1)
    .min_connections(1)
    .acquire_timeout(config.acquire_timeout)
    .sqlx_logging(false);

  Database::connect(options).await.map_err(Error::Connection)
}

pub async fn run(config: &Config) -> migration::Result<Report> {
  let patch = config.patch()?;

  info!("Connecting to database...");
  let db = connect(config).await?;

  let report = Applier::new(&db).dry_run(config.dry_run).apply(&patch).await;

  if let Err(err) = db.close().await {
    warn!("Failed to close database connection: {err}");
  }
  report
}

pub fn exit_code(err: &Error) -> u8 {
  match err {
    Error::SchemaConflict { .. } | Error::MissingTable(_) => 2,
    Error::Connection(_) => 3,
    _ => 1,
  }
}
