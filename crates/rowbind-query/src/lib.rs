//! # rowbind-query
//!
//! Declared SQL interfaces executed against pluggable data sources.
//!
//! A caller declares a trait whose methods carry SQL templates. At call time
//! the arguments are substituted into the template by position, the
//! statement runs on a fresh connection from a [`DataSource`], and each
//! result row is mapped into the method's declared entity type.
//!
//! ## Architecture
//!
//! - **DataSource / Connection**: traits every backend implements
//! - **descriptor**: query descriptors and return type resolution
//! - **template**: positional `?` substitution
//! - **mapper**: row to entity conversion driven by [`entity!`] metadata
//! - **QueryEngine**: runs one call end to end
//! - **ProxyFactory**: builds adapters generated by [`query_interface!`]
//! - **SourceRegistry**: creates data sources from [`ConnectionConfig`]
//!
//! ## Example
//!
//! ```rust
//! use rowbind_query::{entity, query_interface};
//!
//! entity! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct District {
//!         pub id: Option<i32>,
//!         pub name: Option<String>,
//!         pub parent_id: Option<i32>,
//!     }
//! }
//!
//! query_interface! {
//!     pub trait DistrictDao => DistrictDaoProxy {
//!         /// All districts with the given id
//!         #[query(" select * from district where id = ? ")]
//!         fn get_district_by_id(&self, id: i32) -> Vec<District>;
//!
//!         #[query(" select * from district where parent_id = ? ")]
//!         fn get_list_by_parent_id(&self, parent_id: i32) -> Vec<District>;
//!     }
//! }
//!
//! # async fn example(
//! #     source: std::sync::Arc<dyn rowbind_query::DataSource>,
//! # ) -> rowbind_query::MapperResult<()> {
//! let dao: DistrictDaoProxy = rowbind_query::create_proxy(source);
//! let districts = dao.get_district_by_id(1).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Backend Implementation
//!
//! To implement a new backend:
//!
//! 1. Create a struct that implements `DataSource`
//! 2. Return a `Connection` from `acquire` that runs statements and releases itself
//! 3. Create a `DataSourceFactory` implementation
//! 4. Register the factory with `SourceRegistry`
//!
//! Backend crates:
//! - `rowbind-query-sqlite` - SQLite implementation
//! - `rowbind-query-postgres` - PostgreSQL implementation

pub mod descriptor;
pub mod engine;
pub mod error;
mod macros;
pub mod mapper;
pub mod proxy;
pub mod registry;
pub mod template;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use descriptor::{
    resolve, ContainerKind, DeclaredType, MethodSignature, QueryDescriptor, QueryReturn,
    ResolvedQuery, ReturnShape, TypeInfo,
};
pub use engine::{Invocation, QueryEngine};
pub use error::{DataError, MapperError, MapperResult, MappingFault, Result};
pub use mapper::{map_rows, Entity, RowMapping};
pub use proxy::{create_proxy, ProxyFactory, QueryProxy};
pub use registry::{ConnectionConfig, DataSourceFactory, SourceRegistry};
pub use template::{render_argument, substitute};
pub use traits::{Connection, DataSource};
pub use types::{Capability, DataRow, DatasetSchema, FieldDef, FieldType, QueryResult, QueryStats};

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use serde_json::Value;
}
