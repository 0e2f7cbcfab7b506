//! PostgreSQL store. Statements come from `crate::sql`; rows are fetched as
//! a single jsonb value each.

use crate::config::ResolvedModel;
use crate::error::AppError;
use crate::query::{FindOptions, Predicate};
use crate::sql::{self, QueryBuf};
use crate::store::{project, ModelStore, ModelView, Row, RowsAndCount};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let values = query.fetch_all(&self.pool).await?;
        Ok(values.into_iter().filter_map(into_row).collect())
    }

    async fn query_one(&self, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let value = query.fetch_optional(&self.pool).await?;
        Ok(value.and_then(into_row))
    }

    async fn query_count(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn into_row(v: Value) -> Option<Row> {
    match v {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[async_trait]
impl ModelStore for PgStore {
    async fn find_and_count_all(&self, view: &ModelView<'_>, options: &FindOptions) -> Result<RowsAndCount, AppError> {
        let model = view.model();
        let rows = self.query_many(&sql::select_page(view, options)).await?;
        let count = self.query_count(&sql::count(view, options)).await?;
        let rows = rows
            .into_iter()
            .map(|r| project(r, model, &options.include, options.raw))
            .collect();
        Ok(RowsAndCount { rows, count })
    }

    async fn find_one(&self, view: &ModelView<'_>, options: &FindOptions) -> Result<Option<Row>, AppError> {
        let model = view.model();
        let row = self.query_one(&sql::select_one(view, options)).await?;
        Ok(row.map(|r| project(r, model, &options.include, options.raw)))
    }

    async fn create(&self, model: &ResolvedModel, fields: &Row) -> Result<Row, AppError> {
        self.query_one(&sql::insert(model, fields))
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, model: &ResolvedModel, key: &Value, fields: &Row) -> Result<(), AppError> {
        let affected = self.execute(&sql::update_by_key(model, key, fields)).await?;
        if affected == 0 {
            return Err(AppError::Db(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    async fn reload(&self, model: &ResolvedModel, key: &Value, paranoid: bool) -> Result<Option<Row>, AppError> {
        self.query_one(&sql::reload(model, key, paranoid)).await
    }

    async fn destroy(&self, view: &ModelView<'_>, predicate: &Predicate) -> Result<u64, AppError> {
        self.execute(&sql::destroy(view, predicate)).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
