use crate::error::Result;
use crate::types::*;
use async_trait::async_trait;
use downcast_rs::{impl_downcast, Downcast};

/// Core trait that all data sources must implement.
///
/// A data source hands out connections; it never executes statements itself.
/// Each call made through a query interface acquires its own connection and
/// releases it before returning.
#[async_trait]
pub trait DataSource: Send + Sync + Downcast {
    /// Get the type name of this data source
    fn source_type(&self) -> &'static str;

    /// Get all capabilities supported by this source
    fn capabilities(&self) -> Vec<Capability>;

    /// Check if a specific capability is supported
    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Open a fresh connection. Connections are never pooled or reused.
    async fn acquire(&self) -> Result<Box<dyn Connection>>;

    /// Close the source gracefully
    async fn close(&self) -> Result<()>;
}

impl_downcast!(DataSource);

/// A single connection borrowed from a [`DataSource`] for one invocation.
#[async_trait]
pub trait Connection: Send {
    /// Execute a statement as a query and collect the full tabular result
    async fn query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Release the connection and any cursor still open on it.
    ///
    /// Must be safe to call after a failed `query`. Calling it twice is a no-op.
    async fn release(&mut self) -> Result<()>;
}
