//! Conversion of tabular results into entity values.

use crate::error::MappingFault;
use crate::types::{DataRow, DatasetSchema, QueryResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// A plain data holder that result rows are mapped into.
///
/// Normally implemented through [`entity!`](crate::entity), which declares
/// the column each field is filled from next to the struct itself.
pub trait Entity: Default + Send + 'static {
    /// Column names this type accepts, in field declaration order
    fn columns() -> &'static [&'static str];

    /// Store `value` in the field declared for `column`.
    ///
    /// Column names match exactly: no case folding, no underscore or
    /// camel-case normalization.
    fn assign(&mut self, column: &str, value: &Value) -> Result<(), MappingFault>;
}

/// Rows mapped from one result, in result order
#[derive(Debug)]
pub struct RowMapping<T> {
    pub rows: Vec<T>,
    /// Fault that stopped mapping early, if any
    pub fault: Option<MappingFault>,
}

impl<T> RowMapping<T> {
    /// Whether every row of the result was mapped
    pub fn is_complete(&self) -> bool {
        self.fault.is_none()
    }
}

/// Map every row of `result` into a fresh `T`.
///
/// The first row that fails to map stops processing: rows mapped before it
/// are kept and the fault is reported alongside them rather than as an error.
pub fn map_rows<T: Entity>(result: &QueryResult) -> RowMapping<T> {
    let mut rows = Vec::with_capacity(result.rows.len());

    for (idx, row) in result.rows.iter().enumerate() {
        match map_row::<T>(&result.schema, row) {
            Ok(entity) => rows.push(entity),
            Err(fault) => {
                warn!(
                    "Row {} could not be mapped into {}, keeping {} earlier row(s): {}",
                    idx,
                    std::any::type_name::<T>(),
                    rows.len(),
                    fault
                );
                return RowMapping {
                    rows,
                    fault: Some(fault),
                };
            }
        }
    }

    debug!(
        "Mapped {} row(s) into {}",
        rows.len(),
        std::any::type_name::<T>()
    );
    RowMapping { rows, fault: None }
}

/// Map a single row, visiting columns in schema order
pub fn map_row<T: Entity>(schema: &DatasetSchema, row: &DataRow) -> Result<T, MappingFault> {
    let mut entity = T::default();

    for column in schema.column_names() {
        let value = row.get(column).unwrap_or(&Value::Null);
        entity.assign(column, value)?;
    }

    Ok(entity)
}

/// Deserialize a column value into a field slot.
///
/// No coercion happens beyond what `serde` accepts for the field type, so a
/// NULL only fits an `Option` field.
pub fn assign_field<F: DeserializeOwned>(
    slot: &mut F,
    column: &str,
    target: &'static str,
    value: &Value,
) -> Result<(), MappingFault> {
    *slot = F::deserialize(value).map_err(|e| MappingFault::IncompatibleValue {
        column: column.to_string(),
        target,
        reason: e.to_string(),
    })?;
    Ok(())
}
