//! PostgreSQL driver for rowbind-query
//!
//! Implements DataSource for PostgreSQL. Each acquisition opens its own
//! client; releasing it shuts the connection task down.

use async_trait::async_trait;
use base64::Engine as _;
use rowbind_query::{
    Capability, Connection, ConnectionConfig, DataError, DataRow, DataSource, DataSourceFactory,
    DatasetSchema, FieldDef, FieldType, QueryResult, Result,
};
use serde_json::{Number, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, warn};

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_USER: &str = "postgres";

/// PostgreSQL data source implementation
pub struct PostgresSource {
    config: tokio_postgres::Config,
    database_name: String,
}

impl PostgresSource {
    /// Create a new PostgreSQL data source. No connection is made until
    /// the first acquisition.
    pub fn new(host: &str, port: u16, username: &str, password: &str, database: &str) -> Self {
        let mut config = tokio_postgres::Config::new();
        config
            .host(host)
            .port(port)
            .user(username)
            .password(password)
            .dbname(database);

        Self {
            config,
            database_name: database.to_string(),
        }
    }

    pub fn with_application_name(mut self, name: &str) -> Self {
        self.config.application_name(name);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout(timeout);
        self
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Map PostgreSQL type to FieldType
    fn map_pg_type(pg_type: &str) -> FieldType {
        match pg_type {
            "boolean" | "bool" => FieldType::Boolean,
            "\"char\"" | "char" | "smallint" | "int2" => FieldType::Int32,
            "integer" | "int" | "int4" => FieldType::Int32,
            "bigint" | "int8" | "oid" => FieldType::Int64,
            "real" | "float4" => FieldType::Float32,
            "double precision" | "float8" => FieldType::Float64,
            "numeric" | "decimal" => FieldType::Float64,
            "character varying" | "varchar" | "character" | "bpchar" | "text" => FieldType::String,
            "bytea" => FieldType::Bytes,
            "date" => FieldType::Date,
            "timestamp"
            | "timestamp without time zone"
            | "timestamp with time zone"
            | "timestamptz" => FieldType::Timestamp,
            "json" | "jsonb" => FieldType::Json,
            "uuid" => FieldType::Uuid,
            array if array.starts_with('_') => FieldType::Json,
            _ => FieldType::String, // Default fallback
        }
    }

    /// Convert PostgreSQL row to DataRow.
    ///
    /// When several columns share a name the first one wins.
    fn row_to_datarow(row: &Row) -> Result<DataRow> {
        let mut data_row = DataRow::with_capacity(row.len());

        for (idx, column) in row.columns().iter().enumerate() {
            let value = Self::extract_value(row, idx)?;
            data_row.entry(column.name().to_string()).or_insert(value);
        }

        Ok(data_row)
    }

    /// Extract value from PostgreSQL row
    fn extract_value(row: &Row, idx: usize) -> Result<Value> {
        row.try_get::<_, PgValue>(idx)
            .map(|value| value.0)
            .map_err(|e| {
                let column = &row.columns()[idx];
                error!(
                    "Cannot read column {} of type {}: {}",
                    column.name(),
                    column.type_(),
                    e
                );
                DataError::SerializationError(format!(
                    "Cannot read column '{}' of type {}: {}",
                    column.name(),
                    column.type_(),
                    e
                ))
            })
    }
}

type SqlError = Box<dyn std::error::Error + Sync + Send>;

/// A column value of any supported PostgreSQL type, as JSON
#[derive(Debug)]
struct PgValue(Value);

impl<'a> FromSql<'a> for PgValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, SqlError> {
        match ty.kind() {
            Kind::Array(_) => {
                let values = Vec::<PgValue>::from_sql(ty, raw)?;
                return Ok(PgValue(Value::Array(
                    values.into_iter().map(|v| v.0).collect(),
                )));
            }
            Kind::Enum(_) => {
                return Ok(PgValue(Value::String(std::str::from_utf8(raw)?.to_string())));
            }
            _ => {}
        }

        let value = match ty.name() {
            "bool" => Value::Bool(bool::from_sql(ty, raw)?),
            "char" => Value::from(i8::from_sql(ty, raw)?),
            "int2" => Value::from(i16::from_sql(ty, raw)?),
            "int4" => Value::from(i32::from_sql(ty, raw)?),
            "int8" => Value::from(i64::from_sql(ty, raw)?),
            "oid" => Value::from(u32::from_sql(ty, raw)?),
            "float4" => float(f32::from_sql(ty, raw)? as f64),
            "float8" => float(f64::from_sql(ty, raw)?),
            "numeric" => {
                let text = decode_numeric(raw)?;
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::String(text))
            }
            "bytea" => Value::String(
                base64::engine::general_purpose::STANDARD.encode(<&[u8]>::from_sql(ty, raw)?),
            ),
            "date" => Value::String(chrono::NaiveDate::from_sql(ty, raw)?.to_string()),
            "time" => Value::String(chrono::NaiveTime::from_sql(ty, raw)?.to_string()),
            "timestamp" => Value::String(chrono::NaiveDateTime::from_sql(ty, raw)?.to_string()),
            "timestamptz" => Value::String(
                chrono::DateTime::<chrono::Utc>::from_sql(ty, raw)?.to_rfc3339(),
            ),
            "json" | "jsonb" => <Value as FromSql>::from_sql(ty, raw)?,
            "uuid" => Value::String(uuid::Uuid::from_sql(ty, raw)?.to_string()),
            _ if <String as FromSql>::accepts(ty) => Value::String(String::from_sql(ty, raw)?),
            other => return Err(format!("unsupported PostgreSQL type {}", other).into()),
        };

        Ok(PgValue(value))
    }

    fn from_sql_null(_ty: &Type) -> std::result::Result<Self, SqlError> {
        Ok(PgValue(Value::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// NaN and infinities have no JSON number form and are kept as text
fn float(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Render a binary `numeric` value as decimal text.
///
/// Wire layout: digit count, weight, sign and display scale (all 16 bit),
/// then base-10000 digits, most significant first.
fn decode_numeric(raw: &[u8]) -> std::result::Result<String, SqlError> {
    if raw.len() < 8 {
        return Err("numeric value is too short".into());
    }
    let read = |offset: usize| u16::from_be_bytes([raw[offset], raw[offset + 1]]);

    let ndigits = read(0) as usize;
    let weight = read(2) as i16 as i32;
    let sign = read(4);
    let dscale = read(6) as usize;

    if raw.len() != 8 + ndigits * 2 {
        return Err("numeric value has an invalid length".into());
    }

    let negative = match sign {
        NUMERIC_POS => false,
        NUMERIC_NEG => true,
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        other => return Err(format!("invalid numeric sign {:#06x}", other).into()),
    };

    let digits: Vec<u16> = (0..ndigits).map(|i| read(8 + i * 2)).collect();
    let digit = |idx: i32| {
        usize::try_from(idx)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if negative {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for idx in 1..=weight {
            text.push_str(&format!("{:04}", digit(idx)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::new();
        let mut idx = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(idx)));
            idx += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Ok(text)
}

/// Build a detailed message from a PostgreSQL error
fn describe_error(e: &tokio_postgres::Error) -> String {
    let Some(db_error) = e.as_db_error() else {
        // Non-database error (connection error, etc.)
        return e.to_string();
    };

    let mut msg = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        msg.push_str(&format!("\nDetail: {}", detail));
    }

    if let Some(hint) = db_error.hint() {
        msg.push_str(&format!("\nHint: {}", hint));
    }

    if let Some(position) = db_error.position() {
        msg.push_str(&format!("\nPosition: {:?}", position));
    }

    if let Some(column) = db_error.column() {
        msg.push_str(&format!("\nColumn: {}", column));
    }

    msg
}

fn query_failed(e: tokio_postgres::Error, sql: &str) -> DataError {
    error!("PostgreSQL query failed: {}", e);
    error!("Failed SQL: {}", sql);

    if e.is_closed() {
        return DataError::ConnectionLost(describe_error(&e));
    }
    DataError::QueryFailed(format!("{}\n\nQuery: {}", describe_error(&e), sql))
}

#[async_trait]
impl DataSource for PostgresSource {
    fn source_type(&self) -> &'static str {
        "postgres"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Sql]
    }

    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        debug!("Connecting to PostgreSQL database: {}", self.database_name);

        let (client, connection) = self.config.connect(NoTls).await.map_err(|e| {
            DataError::ConnectionFailed(format!(
                "PostgreSQL connection failed: {}",
                describe_error(&e)
            ))
        })?;

        // Spawn connection handler
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Box::new(PostgresConnection {
            client: Some(client),
            handle: Some(handle),
        }))
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing PostgreSQL source {}", self.database_name);
        // Clients are closed when their connection is released
        Ok(())
    }
}

/// One open PostgreSQL client and its connection task
pub struct PostgresConnection {
    client: Option<Client>,
    handle: Option<JoinHandle<()>>,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| DataError::ConnectionLost("connection already released".to_string()))?;

        let start = Instant::now();
        debug!("Executing SQL: {}", sql);

        // Prepare first so column metadata is known even without rows
        let statement = client.prepare(sql).await.map_err(|e| query_failed(e, sql))?;
        let rows = client
            .query(&statement, &[])
            .await
            .map_err(|e| query_failed(e, sql))?;

        let fields = statement
            .columns()
            .iter()
            .map(|col| {
                FieldDef::new(col.name(), PostgresSource::map_pg_type(col.type_().name()))
            })
            .collect();
        let data_rows = rows
            .iter()
            .map(PostgresSource::row_to_datarow)
            .collect::<Result<Vec<DataRow>>>()?;

        let execution_ms = start.elapsed().as_millis() as u64;
        debug!("SQL returned {} rows in {}ms", data_rows.len(), execution_ms);

        Ok(QueryResult::new(
            DatasetSchema::new(fields),
            data_rows,
            execution_ms,
        ))
    }

    async fn release(&mut self) -> Result<()> {
        // Dropping the client ends the connection task
        drop(self.client.take());
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("PostgreSQL connection task ended abnormally: {}", e);
                return Err(DataError::ConnectionLost(format!(
                    "Failed to close PostgreSQL connection: {}",
                    e
                )));
            }
        }
        Ok(())
    }
}

/// Creates [`PostgresSource`]s from `postgres://` configurations.
///
/// Recognized options: `application_name`, `connect_timeout` (seconds).
pub struct PostgresSourceFactory;

impl DataSourceFactory for PostgresSourceFactory {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    fn create_source(&self, config: ConnectionConfig) -> Result<Arc<dyn DataSource>> {
        let host = config.host.as_deref().ok_or_else(|| {
            DataError::invalid_configuration("PostgreSQL configuration requires a host")
        })?;
        let database = config.database.as_deref().ok_or_else(|| {
            DataError::invalid_configuration("PostgreSQL configuration requires a database")
        })?;

        let mut source = PostgresSource::new(
            host,
            config.port.unwrap_or(DEFAULT_PORT),
            config.username.as_deref().unwrap_or(DEFAULT_USER),
            config.password.as_deref().unwrap_or_default(),
            database,
        );
        if let Some(name) = config.options.get("application_name") {
            source = source.with_application_name(name);
        }
        if let Some(secs) = config.option::<u64>("connect_timeout")? {
            source = source.with_connect_timeout(Duration::from_secs(secs));
        }

        debug!("Configured PostgreSQL source {}", config.connection_string());
        Ok(Arc::new(source))
    }
}
