//! Apply a model descriptor to the database: schema, table, column comments.
//! Idempotent (IF NOT EXISTS); existing tables are left as they are.

use crate::config::{FieldDescriptor, ResolvedModel};
use crate::error::AppError;
use crate::schema::FieldType;
use crate::sql::builder::{qualified_table, quoted};
use serde_json::Value;
use sqlx::PgPool;

/// Column type, with serial types standing in for auto-increment integers.
fn column_type(f: &FieldDescriptor) -> String {
    match (&f.field_type, f.auto_increment) {
        (FieldType::Integer, true) => "serial".into(),
        (FieldType::BigInt, true) => "bigserial".into(),
        (ty, _) => ty.pg_type(),
    }
}

fn literal(ty: &FieldType, v: &Value) -> String {
    match (ty, v) {
        (_, Value::Null) => "NULL".into(),
        (FieldType::Json | FieldType::Jsonb, other) => {
            format!("'{}'::{}", other.to_string().replace('\'', "''"), ty.pg_type())
        }
        (_, Value::Bool(b)) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        (_, Value::Number(n)) => n.to_string(),
        (_, Value::String(s)) => format!("'{}'", s.replace('\'', "''")),
        (_, other) => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn column_def(model: &ResolvedModel, f: &FieldDescriptor) -> String {
    let mut def = format!("{} {}", quoted(&f.column), column_type(f));
    if !f.allow_null || f.primary_key {
        def.push_str(" NOT NULL");
    }
    let is_timestamp = model.created_at.as_deref() == Some(f.name.as_str())
        || model.updated_at.as_deref() == Some(f.name.as_str());
    if is_timestamp {
        def.push_str(" DEFAULT NOW()");
    } else if let Some(d) = &f.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(&literal(&f.field_type, d));
    }
    if let FieldType::Enum { values } = &f.field_type {
        let values: Vec<String> = values.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect();
        def.push_str(&format!(" CHECK ({} IN ({}))", quoted(&f.column), values.join(", ")));
    }
    def
}

/// CREATE TABLE statement for the model.
pub fn create_table_sql(model: &ResolvedModel) -> String {
    let mut defs: Vec<String> = model.fields.iter().map(|f| column_def(model, f)).collect();
    defs.push(format!("PRIMARY KEY ({})", quoted(&model.primary_key_field().column)));
    for group in &model.unique {
        let cols: Vec<String> = group
            .iter()
            .map(|attr| quoted(model.column_for(attr).unwrap_or(attr)))
            .collect();
        defs.push(format!("UNIQUE ({})", cols.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(&model.table),
        defs.join(",\n  ")
    )
}

/// Create the schema (if any) and the table for `model`.
pub async fn sync(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    if let Some(schema) = &model.table.schema {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema));
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
    }
    let sql = create_table_sql(model);
    tracing::debug!(sql = %sql, "ddl");
    sqlx::query(&sql).execute(pool).await?;

    for f in &model.fields {
        let Some(comment) = &f.comment else { continue };
        let sql = format!(
            "COMMENT ON COLUMN {}.{} IS '{}'",
            qualified_table(&model.table),
            quoted(&f.column),
            comment.replace('\'', "''")
        );
        if let Err(e) = sqlx::query(&sql).execute(pool).await {
            tracing::warn!(column = %f.column, error = %e, "column comment not applied");
        }
    }
    tracing::info!(model = %model.name, table = %model.table.key(), paranoid = model.is_paranoid(), "schema synced");
    Ok(())
}
