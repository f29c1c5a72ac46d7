//! Sequential, idempotent execution of a [`Patch`]
//!
//! Every operation checks the catalog first and becomes a no-op when its
//! effect is already present. The first failure aborts the remaining
//! operations. All operations share one transaction, committed only when
//! every operation succeeded; backends without transactional DDL keep
//! whatever already ran.

use std::{collections::HashSet, fmt};

use sea_orm_migration::{
  prelude::*,
  sea_orm::{DatabaseConnection, TransactionTrait},
};
use tracing::{error, info, warn};

use crate::{
  Catalog, ColumnType, Error, Operation, Patch, Result, catalog::ColumnInfo,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Applied,
  /// Would be applied; only produced by dry runs.
  Planned,
  Skipped(String),
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::Applied => f.write_str("applied"),
      Outcome::Planned => f.write_str("planned"),
      Outcome::Skipped(reason) => write!(f, "skipped ({reason})"),
    }
  }
}

#[derive(Debug, Clone)]
pub struct OperationReport {
  pub operation: Operation,
  pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct Report {
  pub table: String,
  pub dry_run: bool,
  pub outcomes: Vec<OperationReport>,
}

impl Report {
  fn count(&self, f: impl Fn(&Outcome) -> bool) -> usize {
    self.outcomes.iter().filter(|r| f(&r.outcome)).count()
  }

  pub fn applied(&self) -> usize {
    self.count(|o| *o == Outcome::Applied)
  }

  pub fn planned(&self) -> usize {
    self.count(|o| *o == Outcome::Planned)
  }

  pub fn skipped(&self) -> usize {
    self.count(|o| matches!(o, Outcome::Skipped(_)))
  }

  /// No structural change was made (or would be made, for a dry run).
  pub fn is_noop(&self) -> bool {
    self.applied() == 0 && self.planned() == 0
  }
}

/// Schema effects a dry run has planned but not executed.
#[derive(Default)]
struct Pending {
  added: HashSet<String>,
  removed: HashSet<String>,
  indexes: HashSet<String>,
}

pub struct Applier<'a> {
  db: &'a DatabaseConnection,
  dry_run: bool,
}

impl<'a> Applier<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db, dry_run: false }
  }

  pub fn dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  pub async fn apply(&self, patch: &Patch) -> Result<Report> {
    patch.validate()?;

    let table = patch.table.as_str();

    // dropping the transaction on error rolls back whatever the backend can
    let txn = self.db.begin().await?;

    let outcomes = {
      let catalog = Catalog::new(&txn);

      if !catalog.has_table(table).await? {
        error!("Table {table} not found, nothing applied");
        return Err(Error::MissingTable(table.to_string()));
      }

      info!(
        "Patching {table}: {} operations{}",
        patch.operations.len(),
        if self.dry_run { " (dry run)" } else { "" }
      );

      let mut pending = Pending::default();
      let mut outcomes = Vec::with_capacity(patch.operations.len());

      for op in &patch.operations {
        let outcome = match self.step(&catalog, &mut pending, table, op).await
        {
          Ok(outcome) => outcome,
          Err(err) => {
            error!("{op}: failed: {err}");
            return Err(err);
          }
        };

        info!("{op}: {outcome}");
        outcomes.push(OperationReport { operation: op.clone(), outcome });
      }

      outcomes
    };

    if self.dry_run {
      txn.rollback().await?;
    } else {
      txn.commit().await?;
    }

    let report =
      Report { table: table.to_string(), dry_run: self.dry_run, outcomes };

    info!(
      "Patched {table}: {} applied, {} planned, {} skipped",
      report.applied(),
      report.planned(),
      report.skipped()
    );

    Ok(report)
  }

  async fn step(
    &self,
    catalog: &Catalog<'_>,
    pending: &mut Pending,
    table: &str,
    op: &Operation,
  ) -> Result<Outcome> {
    match op {
      Operation::RenameColumn { from, to } => {
        let source = column_exists(catalog, pending, table, from).await?;
        let target = column_exists(catalog, pending, table, to).await?;

        match (source, target) {
          (true, false) => {}
          (true, true) => {
            warn!("{table}.{from} kept alongside {table}.{to}");
            return Ok(skipped("target already present"));
          }
          (false, true) => return Ok(skipped("already renamed")),
          (false, false) => return Ok(skipped("source column absent")),
        }

        if self.dry_run {
          pending.added.remove(from);
          pending.removed.insert(from.clone());
          pending.removed.remove(to);
          pending.added.insert(to.clone());
          return Ok(Outcome::Planned);
        }

        catalog
          .manager()
          .alter_table(
            Table::alter()
              .table(Alias::new(table))
              .rename_column(Alias::new(from), Alias::new(to))
              .to_owned(),
          )
          .await?;
      }

      Operation::AddColumn { name, ty, nullable } => {
        if pending.added.contains(name) {
          return Ok(skipped("already present"));
        }

        let existing = if pending.removed.contains(name) {
          None
        } else {
          catalog.column(table, name).await?
        };
        if let Some(existing) = existing {
          check_compatible(table, name, *ty, *nullable, &existing)?;
          return Ok(skipped("already present"));
        }

        if self.dry_run {
          pending.removed.remove(name);
          pending.added.insert(name.clone());
          return Ok(Outcome::Planned);
        }

        let mut column = ColumnDef::new(Alias::new(name));
        match ty {
          ColumnType::Integer => column.integer(),
          ColumnType::Boolean => column.boolean(),
        };
        if *nullable {
          column.null();
        } else {
          column.not_null();
        }

        catalog
          .manager()
          .alter_table(
            Table::alter()
              .table(Alias::new(table))
              .add_column(column)
              .to_owned(),
          )
          .await?;
      }

      Operation::CreateIndex { name, columns } => {
        if pending.indexes.contains(name)
          || catalog.has_index(table, name).await?
        {
          return Ok(skipped("already present"));
        }

        if self.dry_run {
          pending.indexes.insert(name.clone());
          return Ok(Outcome::Planned);
        }

        let mut index = Index::create();
        index.name(name).table(Alias::new(table)).if_not_exists();
        for column in columns {
          index.col(Alias::new(column));
        }

        catalog.manager().create_index(index).await?;
      }
    }

    Ok(Outcome::Applied)
  }
}

fn skipped(reason: &str) -> Outcome {
  Outcome::Skipped(reason.to_string())
}

async fn column_exists(
  catalog: &Catalog<'_>,
  pending: &Pending,
  table: &str,
  column: &str,
) -> Result<bool> {
  if pending.added.contains(column) {
    return Ok(true);
  }
  if pending.removed.contains(column) {
    return Ok(false);
  }
  catalog.has_column(table, column).await
}

fn check_compatible(
  table: &str,
  column: &str,
  ty: ColumnType,
  nullable: bool,
  existing: &ColumnInfo,
) -> Result<()> {
  if ty.accepts(&existing.data_type) && existing.nullable == nullable {
    return Ok(());
  }

  let null = |nullable: bool| if nullable { "null" } else { "not null" };
  Err(Error::SchemaConflict {
    table: table.to_string(),
    column: column.to_string(),
    expected: format!("{ty} {}", null(nullable)),
    found: format!("{} {}", existing.data_type, null(existing.nullable)),
  })
}
