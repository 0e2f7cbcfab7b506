//! HTTP handlers for the CRUD controller.

pub mod crud;
pub use crud::*;
