//! Safe SQL builder: identifiers from config only, values as parameters.

mod builder;
pub mod ddl;
pub mod params;
pub use builder::*;
pub use ddl::sync;
pub use params::*;
