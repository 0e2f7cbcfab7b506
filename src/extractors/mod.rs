//! Request extractors.

mod role;
pub use role::{RoleHeader, ROLE_HEADER};
