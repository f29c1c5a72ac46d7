//! Error types for the schema patch

use sea_orm_migration::prelude::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Connection failure: {0}")]
  Connection(DbErr),

  #[error("Database error: {0}")]
  Database(DbErr),

  #[error(
    "Schema conflict on {table}.{column}: expected {expected}, found {found}"
  )]
  SchemaConflict {
    table: String,
    column: String,
    expected: String,
    found: String,
  },

  #[error("Table `{0}` does not exist")]
  MissingTable(String),

  #[error("Invalid patch: {0}")]
  InvalidPatch(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Malformed patch document: {0}")]
  Json(#[from] json::Error),
}

impl From<DbErr> for Error {
  fn from(err: DbErr) -> Self {
    match err {
      DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::Connection(err),
      err => Self::Database(err),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
