pub mod district;

pub use district::DistrictCommand;
