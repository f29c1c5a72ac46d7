//! Patch documents: an ordered list of DDL operations against one table.
//!
//! Patches are configuration data. The built-in `player_season_stats` patch
//! is embedded from `patches/`, any other document can be loaded from disk.

use std::{collections::HashSet, fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const BUILTIN: &str =
  include_str!("../patches/m20260301_000001_player_season_stats.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Integer,
  Boolean,
}

impl ColumnType {
  /// Whether a type name reported by the catalog satisfies this type.
  pub fn accepts(self, declared: &str) -> bool {
    let declared = declared.trim().to_ascii_lowercase();
    let base = declared.split('(').next().unwrap_or_default().trim();

    match self {
      // mysql reports booleans as tinyint(1)
      ColumnType::Boolean => {
        matches!(base, "bool" | "boolean" | "tinyint")
      }
      ColumnType::Integer => matches!(
        base,
        "int"
          | "integer"
          | "smallint"
          | "bigint"
          | "tinyint"
          | "mediumint"
          | "int2"
          | "int4"
          | "int8"
      ),
    }
  }
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ColumnType::Integer => f.write_str("integer"),
      ColumnType::Boolean => f.write_str("boolean"),
    }
  }
}

fn nullable() -> bool {
  true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
  /// Runs only while `from` exists and `to` does not.
  RenameColumn { from: String, to: String },
  AddColumn {
    name: String,
    #[serde(rename = "type")]
    ty: ColumnType,
    #[serde(default = "nullable")]
    nullable: bool,
  },
  CreateIndex { name: String, columns: Vec<String> },
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::RenameColumn { from, to } => {
        write!(f, "rename column {from} -> {to}")
      }
      Operation::AddColumn { name, ty, nullable } => {
        let null = if *nullable { "null" } else { "not null" };
        write!(f, "add column {name} {ty} {null}")
      }
      Operation::CreateIndex { name, columns } => {
        write!(f, "create index {name} ({})", columns.join(", "))
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
  pub table: String,
  pub operations: Vec<Operation>,
}

impl Patch {
  pub fn builtin() -> Result<Self> {
    Self::from_json(BUILTIN)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }

  pub fn from_json(content: &str) -> Result<Self> {
    let patch: Patch = json::from_str(content)?;
    patch.validate()?;
    Ok(patch)
  }

  pub fn validate(&self) -> Result<()> {
    ident(&self.table)?;

    if self.operations.is_empty() {
      return Err(invalid("patch has no operations"));
    }

    let mut seen_add = false;
    for op in &self.operations {
      match op {
        Operation::RenameColumn { from, to } => {
          ident(from)?;
          ident(to)?;
          if from == to {
            return Err(invalid(format!("rename of `{from}` onto itself")));
          }
          if seen_add {
            return Err(invalid(format!(
              "rename of `{from}` must precede every add_column"
            )));
          }
        }
        Operation::AddColumn { name, .. } => {
          ident(name)?;
          seen_add = true;
        }
        Operation::CreateIndex { name, columns } => {
          ident(name)?;
          if columns.is_empty() {
            return Err(invalid(format!("index `{name}` has no columns")));
          }
          let mut unique = HashSet::new();
          for column in columns {
            ident(column)?;
            if !unique.insert(column) {
              return Err(invalid(format!(
                "index `{name}` lists `{column}` twice"
              )));
            }
          }
        }
      }
    }

    Ok(())
  }
}

fn invalid(msg: impl Into<String>) -> Error {
  Error::InvalidPatch(msg.into())
}

fn ident(name: &str) -> Result<()> {
  let valid = name
    .chars()
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

  if valid {
    Ok(())
  } else {
    Err(invalid(format!("`{name}` is not a valid identifier")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_patch() {
    let patch = Patch::builtin().unwrap();

    assert_eq!(patch.table, "player_season_stats");
    assert_eq!(
      patch.operations[0],
      Operation::RenameColumn {
        from: "shots".into(),
        to: "shots_total".into()
      }
    );
    assert!(patch.operations.contains(&Operation::AddColumn {
      name: "lineups".into(),
      ty: ColumnType::Integer,
      nullable: true,
    }));
    assert!(patch.operations.contains(&Operation::AddColumn {
      name: "captain".into(),
      ty: ColumnType::Boolean,
      nullable: true,
    }));
    assert_eq!(
      patch.operations.last(),
      Some(&Operation::CreateIndex {
        name: "ix_player_season_stats_team_season".into(),
        columns: vec!["team_id".into(), "season".into()],
      })
    );
  }

  #[test]
  fn test_builtin_adds_rename_targets_as_fallback() {
    let patch = Patch::builtin().unwrap();

    for target in ["shots_total", "shots_on"] {
      assert!(patch.operations.iter().any(|op| matches!(
        op,
        Operation::AddColumn { name, .. } if name == target
      )));
    }
  }

  #[test]
  fn test_nullable_defaults_to_true() {
    let patch = Patch::from_json(
      r#"{"table": "t", "operations": [
        {"op": "add_column", "name": "c", "type": "integer"}
      ]}"#,
    )
    .unwrap();

    assert!(matches!(
      patch.operations[0],
      Operation::AddColumn { nullable: true, .. }
    ));
  }

  #[test]
  fn test_rejects_rename_after_add() {
    let err = Patch::from_json(
      r#"{"table": "t", "operations": [
        {"op": "add_column", "name": "b", "type": "integer"},
        {"op": "rename_column", "from": "a", "to": "b"}
      ]}"#,
    )
    .unwrap_err();

    assert!(matches!(err, Error::InvalidPatch(_)));
  }

  #[test]
  fn test_rejects_bad_documents() {
    let cases = [
      r#"{"table": "t", "operations": []}"#,
      r#"{"table": "t; drop", "operations": [
        {"op": "add_column", "name": "c", "type": "integer"}]}"#,
      r#"{"table": "t", "operations": [
        {"op": "rename_column", "from": "a", "to": "a"}]}"#,
      r#"{"table": "t", "operations": [
        {"op": "create_index", "name": "ix", "columns": []}]}"#,
      r#"{"table": "t", "operations": [
        {"op": "create_index", "name": "ix", "columns": ["a", "a"]}]}"#,
      r#"{"table": "t", "operations": [
        {"op": "add_column", "name": "1c", "type": "integer"}]}"#,
    ];

    for case in cases {
      assert!(
        matches!(Patch::from_json(case), Err(Error::InvalidPatch(_))),
        "{case}"
      );
    }
  }

  #[test]
  fn test_unknown_operation_is_malformed() {
    let err = Patch::from_json(
      r#"{"table": "t", "operations": [{"op": "drop_column", "name": "c"}]}"#,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Json(_)));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patch.json");
    std::fs::write(
      &path,
      r#"{"table": "t", "operations": [
        {"op": "create_index", "name": "ix_t_a", "columns": ["a"]}
      ]}"#,
    )
    .unwrap();

    let patch = Patch::load(&path).unwrap();
    assert_eq!(patch.table, "t");

    let missing = Patch::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(missing, Error::Io(_)));
  }

  #[test]
  fn test_column_type_accepts() {
    assert!(ColumnType::Integer.accepts("INTEGER"));
    assert!(ColumnType::Integer.accepts("bigint"));
    assert!(ColumnType::Integer.accepts("int(11)"));
    assert!(!ColumnType::Integer.accepts("text"));
    assert!(!ColumnType::Integer.accepts("REAL"));
    assert!(!ColumnType::Integer.accepts("interval"));
    assert!(!ColumnType::Integer.accepts("point"));
    assert!(ColumnType::Integer.accepts("int8"));

    assert!(ColumnType::Boolean.accepts("boolean"));
    assert!(ColumnType::Boolean.accepts("BOOL"));
    assert!(ColumnType::Boolean.accepts("tinyint(1)"));
    assert!(!ColumnType::Boolean.accepts("integer"));
  }

  #[test]
  fn test_operation_display() {
    let op = Operation::AddColumn {
      name: "lineups".into(),
      ty: ColumnType::Integer,
      nullable: true,
    };
    assert_eq!(op.to_string(), "add column lineups integer null");
  }
}
