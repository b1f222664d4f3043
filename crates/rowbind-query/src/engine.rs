//! Invocation engine behind every generated query interface adapter.

use crate::descriptor::{self, MethodSignature, QueryReturn, TypeInfo};
use crate::error::{DataError, MapperError, MapperResult, MappingFault};
use crate::mapper::{self, Entity};
use crate::template;
use crate::traits::DataSource;
use crate::types::{Capability, QueryResult, QueryStats};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of running one template against the data source
#[derive(Debug)]
pub struct Invocation<T> {
    /// Statement after argument substitution
    pub statement: String,
    /// Rows mapped before any fault, in result order
    pub rows: Vec<T>,
    /// Row mapping fault that cut the result short
    pub fault: Option<MappingFault>,
    pub stats: QueryStats,
}

/// Executes calls made through a query interface.
///
/// The engine keeps no state between calls: every invocation resolves its
/// method again, acquires its own connection and releases it before
/// mapping rows.
#[derive(Clone)]
pub struct QueryEngine {
    source: Arc<dyn DataSource>,
}

impl QueryEngine {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Run the method described by `method` with the rendered call arguments.
    pub async fn invoke<R: QueryReturn>(
        &self,
        method: &MethodSignature,
        args: Vec<String>,
    ) -> MapperResult<R> {
        let Some(resolved) = descriptor::resolve(method) else {
            debug!("{} has no query descriptor, returning empty result", method);
            return Ok(R::empty());
        };

        let expected = TypeInfo::of::<R::Target>();
        if resolved.target != expected {
            return Err(MapperError::TargetMismatch {
                declared: resolved.target.name(),
                expected: expected.name(),
            });
        }

        let invocation = self
            .execute::<R::Target>(resolved.template, &args)
            .await?;

        debug!(
            "{} mapped {} row(s) in {}ms",
            method,
            invocation.rows.len(),
            invocation.stats.execution_ms
        );

        R::from_rows(method, invocation.rows)
    }

    /// Substitute `args` into `template`, run it and map the rows into `T`.
    ///
    /// A row mapping fault does not fail the call; it is reported in
    /// [`Invocation::fault`] next to the rows mapped before it.
    pub async fn execute<T: Entity>(
        &self,
        template: &str,
        args: &[String],
    ) -> MapperResult<Invocation<T>> {
        let statement = template::substitute(template, args)?;
        let result = self.run(&statement).await?;
        let mapping = mapper::map_rows::<T>(&result);

        Ok(Invocation {
            statement,
            rows: mapping.rows,
            fault: mapping.fault,
            stats: result.stats,
        })
    }

    /// Acquire a connection, run one statement and release the connection
    /// whether or not the statement succeeded.
    async fn run(&self, statement: &str) -> MapperResult<QueryResult> {
        if !self.source.supports(Capability::Sql) {
            return Err(DataError::OperationNotSupported(format!(
                "{} source does not support {} statements",
                self.source.source_type(),
                Capability::Sql
            ))
            .into());
        }

        let mut connection = self.source.acquire().await?;

        debug!(
            "Executing statement on {}: {}",
            self.source.source_type(),
            statement
        );
        let outcome = connection.query(statement).await;

        if let Err(e) = connection.release().await {
            warn!("Failed to release {} connection: {}", self.source.source_type(), e);
        }

        outcome.map_err(|e| {
            error!("Statement failed: {}", e);
            MapperError::DataAccess(e)
        })
    }
}
