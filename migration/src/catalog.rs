//! Live schema introspection

use sea_orm_migration::{
  IntoSchemaManagerConnection,
  prelude::*,
  sea_orm::{ConnectionTrait, DatabaseBackend, Statement, Value},
};

use crate::Result;

const SQLITE_COLUMN: &str = r#"
SELECT type AS data_type,
       CASE WHEN "notnull" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable
FROM pragma_table_info(?)
WHERE lower(name) = lower(?)"#;

// information_schema exposes domain types sqlx can't decode as text
const POSTGRES_COLUMN: &str = r#"
SELECT data_type::text AS data_type, is_nullable::text AS is_nullable
FROM information_schema.columns
WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2"#;

const MYSQL_COLUMN: &str = r#"
SELECT CAST(DATA_TYPE AS CHAR) AS data_type,
       CAST(IS_NULLABLE AS CHAR) AS is_nullable
FROM information_schema.columns
WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?"#;

/// A column as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
  pub data_type: String,
  pub nullable: bool,
}

pub struct Catalog<'a> {
  manager: SchemaManager<'a>,
}

impl<'a> Catalog<'a> {
  /// Works over a connection or an open transaction.
  pub fn new(conn: impl IntoSchemaManagerConnection<'a>) -> Self {
    Self { manager: SchemaManager::new(conn) }
  }

  pub fn manager(&self) -> &SchemaManager<'a> {
    &self.manager
  }

  pub async fn has_table(&self, table: &str) -> Result<bool> {
    Ok(self.manager.has_table(table).await?)
  }

  pub async fn has_index(&self, table: &str, index: &str) -> Result<bool> {
    Ok(self.manager.has_index(table, index).await?)
  }

  pub async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
    Ok(self.column(table, column).await?.is_some())
  }

  pub async fn column(
    &self,
    table: &str,
    column: &str,
  ) -> Result<Option<ColumnInfo>> {
    let db = self.manager.get_connection();
    let backend = db.get_database_backend();

    let sql = match backend {
      DatabaseBackend::Sqlite => SQLITE_COLUMN,
      DatabaseBackend::Postgres => POSTGRES_COLUMN,
      DatabaseBackend::MySql => MYSQL_COLUMN,
    };
    let stmt = Statement::from_sql_and_values(
      backend,
      sql,
      [Value::from(table), Value::from(column)],
    );

    let Some(row) = db.query_one(stmt).await? else {
      return Ok(None);
    };

    let data_type: String = row.try_get("", "data_type")?;
    let is_nullable: String = row.try_get("", "is_nullable")?;

    Ok(Some(ColumnInfo {
      data_type,
      nullable: is_nullable.eq_ignore_ascii_case("yes"),
    }))
  }
}
