//! Idempotent schema patch for `player_season_stats`

mod applier;
mod catalog;
mod error;
mod patch;

pub use applier::{Applier, OperationReport, Outcome, Report};
pub use catalog::{Catalog, ColumnInfo};
pub use error::{Error, Result};
pub use patch::{ColumnType, Operation, Patch};
