//! SQLite driver for rowbind-query
//!
//! Implements DataSource over a SQLite database file. Every acquisition opens
//! a new connection; statements run on the blocking thread pool.

use async_trait::async_trait;
use base64::Engine as _;
use rowbind_query::{
    Capability, ConnectionConfig, Connection, DataError, DataRow, DataSource, DataSourceFactory,
    DatasetSchema, FieldDef, FieldType, QueryResult, Result,
};
use rusqlite::types::ValueRef;
use rusqlite::OpenFlags;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// SQLite data source implementation
pub struct SqliteSource {
    path: PathBuf,
    flags: OpenFlags,
    busy_timeout: Option<Duration>,
}

impl SqliteSource {
    /// Data source over the database file at `path`, created on first use
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            flags: OpenFlags::default(),
            busy_timeout: None,
        }
    }

    /// Open connections read-only; the file must already exist
    pub fn read_only(mut self) -> Self {
        self.flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map a declared SQLite column type to FieldType
    fn map_sqlite_type(decl_type: Option<&str>) -> FieldType {
        let Some(decl_type) = decl_type else {
            return FieldType::String;
        };
        let decl_type = decl_type.to_ascii_lowercase();

        // Type affinity rules, in SQLite's order of precedence
        if decl_type.contains("int") {
            FieldType::Int64
        } else if decl_type.contains("char") || decl_type.contains("clob") || decl_type.contains("text") {
            FieldType::String
        } else if decl_type.contains("blob") {
            FieldType::Bytes
        } else if decl_type.contains("real") || decl_type.contains("floa") || decl_type.contains("doub") {
            FieldType::Float64
        } else if decl_type.starts_with("bool") {
            FieldType::Boolean
        } else if decl_type == "date" {
            FieldType::Date
        } else if decl_type.starts_with("datetime") || decl_type.starts_with("timestamp") {
            FieldType::Timestamp
        } else if decl_type == "json" {
            FieldType::Json
        } else {
            FieldType::String // Default fallback
        }
    }

    /// Convert a SQLite value to JSON
    fn extract_value(value: ValueRef<'_>) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(v) => serde_json::Value::Number(v.into()),
            ValueRef::Real(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(bytes) => {
                serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            ValueRef::Blob(bytes) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(bytes),
            ),
        }
    }

    /// Run one statement and collect every row. When several columns share
    /// a name the first one wins.
    fn run_query(conn: &rusqlite::Connection, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let mut statement = conn.prepare(sql).map_err(|e| query_failed(e, sql))?;

        let fields: Vec<FieldDef> = statement
            .columns()
            .iter()
            .map(|column| FieldDef::new(column.name(), Self::map_sqlite_type(column.decl_type())))
            .collect();

        let mut rows = statement.query([]).map_err(|e| query_failed(e, sql))?;
        let mut data_rows = Vec::new();

        while let Some(row) = rows.next().map_err(|e| query_failed(e, sql))? {
            let mut data_row = DataRow::with_capacity(fields.len());
            for (idx, field) in fields.iter().enumerate() {
                let value = row.get_ref(idx).map_err(|e| query_failed(e, sql))?;
                data_row
                    .entry(field.name.clone())
                    .or_insert_with(|| Self::extract_value(value));
            }
            data_rows.push(data_row);
        }

        let execution_ms = start.elapsed().as_millis() as u64;
        debug!("SQL returned {} rows in {}ms", data_rows.len(), execution_ms);

        Ok(QueryResult::new(
            DatasetSchema::new(fields),
            data_rows,
            execution_ms,
        ))
    }
}

fn query_failed(e: rusqlite::Error, sql: &str) -> DataError {
    error!("SQLite query failed: {}", e);
    error!("Failed SQL: {}", sql);
    DataError::QueryFailed(format!("{}\n\nQuery: {}", e, sql))
}

#[async_trait]
impl DataSource for SqliteSource {
    fn source_type(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Sql]
    }

    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        let path = self.path.clone();
        let flags = self.flags;
        let busy_timeout = self.busy_timeout;

        let conn = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open_with_flags(&path, flags)?;
            if let Some(timeout) = busy_timeout {
                conn.busy_timeout(timeout)?;
            }
            Ok::<_, rusqlite::Error>(conn)
        })
        .await
        .map_err(|e| DataError::Internal(format!("SQLite worker failed: {}", e)))?
        .map_err(|e| {
            DataError::ConnectionFailed(format!(
                "Failed to open SQLite database {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Opened SQLite connection to {}", self.path.display());
        Ok(Box::new(SqliteConnection { conn: Some(conn) }))
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing SQLite source {}", self.path.display());
        // Connections are closed when released
        Ok(())
    }
}

/// One open SQLite connection
pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| DataError::ConnectionLost("connection already released".to_string()))?;
        let sql = sql.to_string();

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = SqliteSource::run_query(&conn, &sql);
            (conn, result)
        })
        .await
        .map_err(|e| DataError::Internal(format!("SQLite worker failed: {}", e)))?;

        self.conn = Some(conn);
        result
    }

    async fn release(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| {
                DataError::ConnectionLost(format!("Failed to close SQLite connection: {}", e))
            })?;
        }
        Ok(())
    }
}

/// Creates [`SqliteSource`]s from `sqlite://` configurations.
///
/// Recognized options: `mode=ro` for read-only access, `busy_timeout_ms`.
pub struct SqliteSourceFactory;

impl DataSourceFactory for SqliteSourceFactory {
    fn backend_type(&self) -> &'static str {
        "sqlite"
    }

    fn create_source(&self, config: ConnectionConfig) -> Result<Arc<dyn DataSource>> {
        let path = config.database.as_deref().ok_or_else(|| {
            DataError::invalid_configuration("SQLite configuration requires a database path")
        })?;

        let mut source = SqliteSource::open(path);
        if config.options.get("mode").map(String::as_str) == Some("ro") {
            source = source.read_only();
        }
        if let Some(ms) = config.option::<u64>("busy_timeout_ms")? {
            source = source.with_busy_timeout(Duration::from_millis(ms));
        }

        Ok(Arc::new(source))
    }
}
