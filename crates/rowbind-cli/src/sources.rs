use anyhow::Context;
use rowbind_query::{ConnectionConfig, DataSource, SourceRegistry};
use rowbind_query_postgres::PostgresSourceFactory;
use rowbind_query_sqlite::SqliteSourceFactory;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry with every bundled backend registered
pub async fn default_registry() -> anyhow::Result<SourceRegistry> {
    let registry = SourceRegistry::new();
    registry
        .register_factory(Arc::new(SqliteSourceFactory))
        .await?;
    registry
        .register_factory(Arc::new(PostgresSourceFactory))
        .await?;
    Ok(registry)
}

/// Build the data source described by `database_url`
pub async fn connect(database_url: &str) -> anyhow::Result<Arc<dyn DataSource>> {
    let config = ConnectionConfig::from_url(database_url)
        .with_context(|| "Failed to parse database URL".to_string())?;
    debug!("Using database {}", config.connection_string());

    let registry = default_registry().await?;
    let source = registry
        .create_source("default", config)
        .await
        .context("Failed to create data source")?;
    Ok(source)
}

/// Run `f` against `source`, then close the source whether or not `f`
/// succeeded. The error from `f` takes precedence over a close failure.
pub async fn close_after<T, F, Fut>(source: Arc<dyn DataSource>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(Arc<dyn DataSource>) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let result = f(source.clone()).await;

    match source.close().await {
        Ok(()) => result,
        Err(e) if result.is_err() => {
            warn!("Failed to close {} source: {}", source.source_type(), e);
            result
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to close data source")),
    }
}
