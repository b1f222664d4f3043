//! Library half of the `rowbind` binary: the district interface and the
//! data source wiring, kept here so integration tests can drive them.

pub mod dao;
pub mod sources;

pub use dao::{District, DistrictDao, DistrictDaoProxy};
pub use sources::{close_after, connect, default_registry};
