//! SQLite adapter for the persisted table backend.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tokio::sync::OnceCell;
use tracing::info;

use crate::backends::persisted::{QueryOutcome, SqlExecutor, SqlValue};
use crate::error::Result;

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Lazily opened SQLite connection.
///
/// The database is opened on the first statement. Statements run on
/// tokio's blocking pool against one shared connection.
pub struct SqliteConnection {
    path: String,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl SqliteConnection {
    /// Creates a handle for the database file at `path`.
    pub fn open(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: OnceCell::new(),
        }
    }

    /// Creates a handle for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::open(IN_MEMORY)
    }

    async fn connection(&self) -> Result<Arc<Mutex<Connection>>> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let conn = tokio::task::spawn_blocking(move || Connection::open(path)).await??;
                info!(path = %self.path, "SQLite database opened");
                Ok::<_, crate::error::CacheError>(Arc::new(Mutex::new(conn)))
            })
            .await?;
        Ok(conn.clone())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            SqlValue::Integer(value) => ToSqlOutput::from(*value),
            SqlValue::Real(value) => ToSqlOutput::from(*value),
            SqlValue::Text(value) => ToSqlOutput::from(value.as_str()),
            SqlValue::Blob(value) => ToSqlOutput::from(value.as_slice()),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(value) => SqlValue::Integer(value),
            ValueRef::Real(value) => SqlValue::Real(value),
            ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
        }
    }
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> rusqlite::Result<QueryOutcome> {
    let mut stmt = conn.prepare_cached(sql)?;
    let columns = stmt.column_count();

    if columns == 0 {
        let changes = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(QueryOutcome {
            rows: Vec::new(),
            changes: changes as u64,
        });
    }

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns);
        for idx in 0..columns {
            cells.push(SqlValue::from(row.get_ref(idx)?));
        }
        collected.push(cells);
    }

    Ok(QueryOutcome {
        rows: collected,
        changes: 0,
    })
}

#[async_trait]
impl SqlExecutor for SqliteConnection {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<QueryOutcome> {
        let conn = self.connection().await?;
        let sql = sql.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            run_statement(&conn, &sql, &params)
        })
        .await??;

        Ok(outcome)
    }
}
