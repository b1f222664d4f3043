use crate::descriptor::MethodSignature;
use crate::engine::QueryEngine;
use crate::traits::DataSource;
use std::sync::Arc;
use tracing::debug;

/// Adapter implementing a declared query interface.
///
/// Generated by [`query_interface!`](crate::query_interface); every method of
/// the interface forwards to the adapter's [`QueryEngine`].
pub trait QueryProxy: Send + Sync + Sized {
    /// Name of the implemented interface
    const INTERFACE: &'static str;

    fn from_engine(engine: QueryEngine) -> Self;

    fn engine(&self) -> &QueryEngine;

    /// Registration table of the interface's methods, in declaration order
    fn signatures() -> Vec<MethodSignature>;
}

/// Builds query interface adapters backed by one data source
#[derive(Clone)]
pub struct ProxyFactory {
    source: Arc<dyn DataSource>,
}

impl ProxyFactory {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Create a live implementation of the interface behind `P`
    pub fn create<P: QueryProxy>(&self) -> P {
        create_proxy(self.source.clone())
    }
}

/// Create a live implementation of the interface behind `P` over `source`
pub fn create_proxy<P: QueryProxy>(source: Arc<dyn DataSource>) -> P {
    debug!(
        "Creating {} proxy over {} source",
        P::INTERFACE,
        source.source_type()
    );
    P::from_engine(QueryEngine::new(source))
}
