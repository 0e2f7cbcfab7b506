//! Persistence engine seam: the narrow interface the actions run against.

mod memory;
mod postgres;
mod projection;
mod view;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use projection::project;
pub use view::ModelView;

use crate::config::ResolvedModel;
use crate::error::AppError;
use crate::query::{FindOptions, Predicate};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Plain row keyed by attribute name.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RowsAndCount {
    pub rows: Vec<Row>,
    pub count: u64,
}

#[async_trait]
pub trait ModelStore: Send + Sync {
    /// One page of matching rows plus the total number of matches.
    async fn find_and_count_all(&self, view: &ModelView<'_>, options: &FindOptions) -> Result<RowsAndCount, AppError>;

    async fn find_one(&self, view: &ModelView<'_>, options: &FindOptions) -> Result<Option<Row>, AppError>;

    /// Insert a row; defaults and timestamps are filled by the store.
    async fn create(&self, model: &ResolvedModel, fields: &Row) -> Result<Row, AppError>;

    /// Apply `fields` to the row identified by `key`.
    async fn update(&self, model: &ResolvedModel, key: &Value, fields: &Row) -> Result<(), AppError>;

    /// Re-read a row by key. With `paranoid` false soft-deleted rows are visible.
    async fn reload(&self, model: &ResolvedModel, key: &Value, paranoid: bool) -> Result<Option<Row>, AppError>;

    /// Remove (or soft-delete) matching rows; returns how many were affected.
    async fn destroy(&self, view: &ModelView<'_>, predicate: &Predicate) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
