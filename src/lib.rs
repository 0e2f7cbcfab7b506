//! crud-ctrl: generic CRUD actions for a single model behind an
//! action/controller dispatch, with role-based scopes and field redaction.

pub mod actions;
pub mod case;
pub mod config;
pub mod controller;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use actions::{ActionName, ActionOutput};
pub use config::{load_from_path, resolve, validate, CrudConfig, ResolvedModel, Settings};
pub use controller::CrudController;
pub use error::{error_formatter, AppError, ConfigError, StructuredError, ValidationErrors};
pub use routes::{common_routes, common_routes_with_ready, crud_routes};
pub use service::{Context, RuleSet};
pub use state::CrudState;
pub use store::{MemoryStore, ModelStore, ModelView, PgStore, Row, RowsAndCount};
