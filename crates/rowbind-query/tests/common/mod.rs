//! In-memory data source recording every statement and connection.

#![allow(dead_code)]

use async_trait::async_trait;
use rowbind_query::{
    Capability, Connection, DataError, DataRow, DataSource, DatasetSchema, FieldDef, FieldType,
    QueryResult, Result,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&str) -> Result<QueryResult> + Send + Sync;

#[derive(Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
}

pub struct MockSource {
    responder: Arc<Responder>,
    pub statements: Arc<Mutex<Vec<String>>>,
    pub counters: Arc<Counters>,
    fail_acquire: bool,
    capabilities: Vec<Capability>,
    latency: Duration,
}

impl MockSource {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<QueryResult> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            statements: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(Counters::default()),
            fail_acquire: false,
            capabilities: vec![Capability::Sql],
            latency: Duration::ZERO,
        }
    }

    /// Source answering every statement with the same result
    pub fn returning(result: QueryResult) -> Self {
        Self::new(move |_| Ok(result.clone()))
    }

    pub fn failing_acquire() -> Self {
        Self {
            fail_acquire: true,
            ..Self::returning(QueryResult::default())
        }
    }

    /// Source that cannot run SQL at all
    pub fn without_capabilities() -> Self {
        Self {
            capabilities: Vec::new(),
            ..Self::returning(QueryResult::default())
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.counters.max_open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn source_type(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.clone()
    }

    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        if self.fail_acquire {
            return Err(DataError::ConnectionFailed("mock refused".to_string()));
        }

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_open.fetch_max(open, Ordering::SeqCst);

        Ok(Box::new(MockConnection {
            responder: self.responder.clone(),
            statements: self.statements.clone(),
            counters: self.counters.clone(),
            latency: self.latency,
            released: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct MockConnection {
    responder: Arc<Responder>,
    statements: Arc<Mutex<Vec<String>>>,
    counters: Arc<Counters>,
    latency: Duration,
    released: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.statements.lock().unwrap().push(sql.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.responder)(sql)
    }

    async fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
            self.counters.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Build a result whose rows hold `values` under `columns`, in order
pub fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    let schema = DatasetSchema::new(
        columns
            .iter()
            .map(|c| FieldDef::new(*c, FieldType::String))
            .collect(),
    );
    let rows = rows
        .into_iter()
        .map(|values| {
            columns
                .iter()
                .map(|c| c.to_string())
                .zip(values)
                .collect::<DataRow>()
        })
        .collect();
    QueryResult::new(schema, rows, 1)
}
