//! Routers for the CRUD surface and operational endpoints.

mod common;
mod crud;

pub use common::{common_routes, common_routes_with_ready};
pub use crud::crud_routes;
