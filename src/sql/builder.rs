//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a resolved model.
//!
//! Every row comes back as one `jsonb` value keyed by attribute name, so the
//! executor never needs to know column types. Parameters bind as text and
//! are cast at their placeholder.

use crate::config::{AssociationKind, AssociationSpec, FieldDescriptor, ResolvedModel, TableRef};
use crate::query::{CompareOp, FindOptions, OrderBy, Predicate};
use crate::schema::FieldType;
use crate::sql::params::{cast_type, to_param};
use crate::store::{ModelView, Row};
use serde_json::Value;

const MAIN_ALIAS: &str = "main";
/// jsonb_build_object takes at most 100 arguments; stay well below.
const PAIRS_PER_OBJECT: usize = 40;

/// Quote identifier for PostgreSQL (safe: only from config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub(crate) fn qualified_table(table: &TableRef) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(&table.name)),
        None => quoted(&table.name),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Option<String>>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Option<String>) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// Placeholder for `v` typed as `ty`.
    fn placeholder(&mut self, ty: &FieldType, v: &Value) -> String {
        let n = self.push_param(to_param(ty, v));
        format!("${}::{}", n, cast_type(ty))
    }
}

fn main_column(column: &str) -> String {
    format!("{}.{}", quoted(MAIN_ALIAS), quoted(column))
}

fn string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `jsonb_build_object('attr', "main"."col", ...)`, chunked and joined with `||`.
fn row_object(model: &ResolvedModel) -> String {
    let pairs: Vec<String> = model
        .fields
        .iter()
        .map(|f| format!("{}, {}", string_literal(&f.name), main_column(&f.column)))
        .collect();
    pairs
        .chunks(PAIRS_PER_OBJECT)
        .map(|chunk| format!("jsonb_build_object({})", chunk.join(", ")))
        .collect::<Vec<_>>()
        .join(" || ")
}

/// Scalar subquery producing the include as jsonb: an object (or NULL) for
/// to-one, an array for to-many.
fn include_subquery(model: &ResolvedModel, assoc: &AssociationSpec) -> String {
    let target = qualified_table(&assoc.target);
    let local = main_column(model.column_for(&assoc.local_key).unwrap_or(&assoc.local_key));
    let remote = format!("\"t\".{}", quoted(&assoc.remote_key));
    match (&assoc.kind, &assoc.through) {
        (AssociationKind::BelongsTo | AssociationKind::HasOne, _) => format!(
            "(SELECT to_jsonb(\"t\") FROM {} AS \"t\" WHERE {} = {} LIMIT 1)",
            target, remote, local
        ),
        (AssociationKind::BelongsToMany, Some(through)) => format!(
            "(SELECT COALESCE(jsonb_agg(to_jsonb(\"t\")), '[]'::jsonb) FROM {} AS \"t\" JOIN {} AS \"j\" ON \"j\".{} = {} WHERE \"j\".{} = {})",
            target,
            qualified_table(&through.table),
            quoted(&through.remote_key),
            remote,
            quoted(&through.local_key),
            local
        ),
        _ => format!(
            "(SELECT COALESCE(jsonb_agg(to_jsonb(\"t\")), '[]'::jsonb) FROM {} AS \"t\" WHERE {} = {})",
            target, remote, local
        ),
    }
}

/// Row object plus one `jsonb_build_object('name', (subquery))` per include.
fn row_expression(model: &ResolvedModel, include: &[String]) -> String {
    let mut parts = vec![row_object(model)];
    for name in include {
        let Some(assoc) = model.association(name) else { continue };
        parts.push(format!(
            "jsonb_build_object({}, {})",
            string_literal(name),
            include_subquery(model, assoc)
        ));
    }
    parts.join(" || ")
}

/// Render a predicate against `"main"`. Empty conjunction is TRUE, empty disjunction FALSE.
pub fn render_predicate(q: &mut QueryBuf, model: &ResolvedModel, p: &Predicate) -> String {
    match p {
        Predicate::All(parts) if parts.is_empty() => "TRUE".into(),
        Predicate::Any(parts) if parts.is_empty() => "FALSE".into(),
        Predicate::All(parts) => group(q, model, parts, " AND "),
        Predicate::Any(parts) => group(q, model, parts, " OR "),
        Predicate::Compare { field, op, value } => match model.field(field) {
            Some(f) => render_compare(q, f, *op, value),
            None => "FALSE".into(),
        },
    }
}

fn group(q: &mut QueryBuf, model: &ResolvedModel, parts: &[Predicate], sep: &str) -> String {
    let rendered: Vec<String> = parts.iter().map(|p| render_predicate(q, model, p)).collect();
    format!("({})", rendered.join(sep))
}

fn render_compare(q: &mut QueryBuf, f: &FieldDescriptor, op: CompareOp, value: &Value) -> String {
    let col = main_column(&f.column);
    let ty = &f.field_type;
    let binary = |q: &mut QueryBuf, sym: &str| format!("{} {} {}", col, sym, q.placeholder(ty, value));
    match op {
        CompareOp::Eq => binary(q, "="),
        CompareOp::Ne => binary(q, "<>"),
        CompareOp::Gt => binary(q, ">"),
        CompareOp::Gte => binary(q, ">="),
        CompareOp::Lt => binary(q, "<"),
        CompareOp::Lte => binary(q, "<="),
        CompareOp::In | CompareOp::NotIn => {
            let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
            if items.is_empty() {
                return if op == CompareOp::In {
                    "FALSE".into()
                } else {
                    format!("{} IS NOT NULL", col)
                };
            }
            let placeholders: Vec<String> = items.iter().map(|v| q.placeholder(ty, v)).collect();
            let kw = if op == CompareOp::In { "IN" } else { "NOT IN" };
            format!("{} {} ({})", col, kw, placeholders.join(", "))
        }
        CompareOp::Like | CompareOp::ILike => {
            let n = q.push_param(to_param(&FieldType::Text, value));
            let kw = if op == CompareOp::Like { "LIKE" } else { "ILIKE" };
            format!("{}::text {} ${}", col, kw, n)
        }
        CompareOp::Is => format!("{} IS {}", col, is_operand(value)),
        CompareOp::Not => format!("{} IS NOT {}", col, is_operand(value)),
    }
}

fn is_operand(v: &Value) -> &'static str {
    match v {
        Value::Bool(true) => "TRUE",
        Value::Bool(false) => "FALSE",
        _ => "NULL",
    }
}

fn order_clause(model: &ResolvedModel, order: &[OrderBy]) -> String {
    let default_order = [OrderBy::asc(model.primary_key.clone())];
    let order = if order.is_empty() { &default_order[..] } else { order };
    let terms: Vec<String> = order
        .iter()
        .map(|o| {
            let col = model.column_for(&o.field).unwrap_or(&o.field);
            format!("{} {}", main_column(col), o.direction.as_sql())
        })
        .collect();
    format!(" ORDER BY {}", terms.join(", "))
}

/// WHERE clause for a view plus an extra predicate. Soft-deleted rows are
/// excluded unless a scope lifts the filter.
fn where_clause(q: &mut QueryBuf, view: &ModelView<'_>, extra: &Predicate, paranoid: bool) -> String {
    let model = view.model();
    let predicate = view.predicate().and(extra.clone());
    let mut where_parts = Vec::new();
    if !predicate.is_trivial() {
        where_parts.push(render_predicate(q, model, &predicate));
    }
    if paranoid && !view.include_deleted() {
        if let Some(col) = deleted_at_column(model) {
            where_parts.push(format!("{} IS NULL", main_column(col)));
        }
    }
    if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    }
}

fn deleted_at_column(model: &ResolvedModel) -> Option<&str> {
    model.deleted_at.as_deref().and_then(|f| model.column_for(f))
}

fn key_clause(q: &mut QueryBuf, model: &ResolvedModel, key: &Value) -> String {
    let pk = model.primary_key_field();
    format!("{} = {}", main_column(&pk.column), q.placeholder(&pk.field_type, key))
}

/// One page of rows as jsonb, with includes.
pub fn select_page(view: &ModelView<'_>, options: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    let model = view.model();
    let where_sql = where_clause(&mut q, view, &options.predicate, true);
    let mut sql = format!(
        "SELECT {} FROM {} AS {}{}{}",
        row_expression(model, &options.include),
        qualified_table(&model.table),
        quoted(MAIN_ALIAS),
        where_sql,
        order_clause(model, &options.order)
    );
    if let Some(limit) = options.limit {
        let n = q.push_param(Some(limit.to_string()));
        sql.push_str(&format!(" LIMIT ${}::bigint", n));
    }
    if options.offset > 0 {
        let n = q.push_param(Some(options.offset.to_string()));
        sql.push_str(&format!(" OFFSET ${}::bigint", n));
    }
    q.sql = sql;
    q
}

/// Total matches for the same view and predicate as `select_page`.
pub fn count(view: &ModelView<'_>, options: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    let model = view.model();
    let where_sql = where_clause(&mut q, view, &options.predicate, true);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} AS {}{}",
        qualified_table(&model.table),
        quoted(MAIN_ALIAS),
        where_sql
    );
    q
}

pub fn select_one(view: &ModelView<'_>, options: &FindOptions) -> QueryBuf {
    let mut options = options.clone();
    options.limit = Some(1);
    options.offset = 0;
    select_page(view, &options)
}

/// INSERT: every known attribute present in `fields`, declared defaults for
/// absent ones, NOW() for timestamps. Auto-increment keys are left to the
/// column default; absent UUID keys use gen_random_uuid().
pub fn insert(model: &ResolvedModel, fields: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for f in &model.fields {
        let is_timestamp = model.created_at.as_deref() == Some(f.name.as_str())
            || model.updated_at.as_deref() == Some(f.name.as_str());
        if is_timestamp {
            cols.push(quoted(&f.column));
            values.push("NOW()".to_string());
            continue;
        }
        let value = fields.get(&f.name).or(f.default_value.as_ref());
        match value {
            Some(v) if !(f.primary_key && v.is_null()) => {
                cols.push(quoted(&f.column));
                values.push(q.placeholder(&f.field_type, v));
            }
            _ if f.primary_key && !f.auto_increment && f.field_type == FieldType::Uuid => {
                cols.push(quoted(&f.column));
                values.push("gen_random_uuid()".to_string());
            }
            _ => {}
        }
    }
    let target = format!("{} AS {}", qualified_table(&model.table), quoted(MAIN_ALIAS));
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", target, row_object(model))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            target,
            cols.join(", "),
            values.join(", "),
            row_object(model)
        )
    };
    q
}

/// UPDATE by primary key: SET known, non-key attributes present in `fields`.
pub fn update_by_key(model: &ResolvedModel, key: &Value, fields: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (name, v) in fields {
        let Some(f) = model.field(name) else { continue };
        if f.primary_key || model.updated_at.as_deref() == Some(name.as_str()) {
            continue;
        }
        sets.push(format!("{} = {}", quoted(&f.column), q.placeholder(&f.field_type, v)));
    }
    if let Some(col) = model.updated_at.as_deref().and_then(|f| model.column_for(f)) {
        sets.push(format!("{} = NOW()", quoted(col)));
    }
    if sets.is_empty() {
        let pk = quoted(&model.primary_key_field().column);
        sets.push(format!("{} = {}", pk, pk));
    }
    let key_sql = key_clause(&mut q, model, key);
    q.sql = format!(
        "UPDATE {} AS {} SET {} WHERE {}",
        qualified_table(&model.table),
        quoted(MAIN_ALIAS),
        sets.join(", "),
        key_sql
    );
    q
}

/// Re-read one row by primary key. With `paranoid` false soft-deleted rows match.
pub fn reload(model: &ResolvedModel, key: &Value, paranoid: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = vec![key_clause(&mut q, model, key)];
    if paranoid {
        if let Some(col) = deleted_at_column(model) {
            where_parts.push(format!("{} IS NULL", main_column(col)));
        }
    }
    q.sql = format!(
        "SELECT {} FROM {} AS {} WHERE {}",
        row_object(model),
        qualified_table(&model.table),
        quoted(MAIN_ALIAS),
        where_parts.join(" AND ")
    );
    q
}

/// DELETE matching rows, or stamp `deleted_at` on live ones when the model soft-deletes.
pub fn destroy(view: &ModelView<'_>, predicate: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let model = view.model();
    let table = qualified_table(&model.table);
    q.sql = match deleted_at_column(model) {
        Some(col) => {
            let mut where_sql = where_clause(&mut q, view, predicate, false);
            let live = format!("{} IS NULL", main_column(col));
            if where_sql.is_empty() {
                where_sql = format!(" WHERE {}", live);
            } else {
                where_sql.push_str(&format!(" AND {}", live));
            }
            format!(
                "UPDATE {} AS {} SET {} = NOW(){}",
                table,
                quoted(MAIN_ALIAS),
                quoted(col),
                where_sql
            )
        }
        None => {
            let where_sql = where_clause(&mut q, view, predicate, false);
            format!("DELETE FROM {} AS {}{}", table, quoted(MAIN_ALIAS), where_sql)
        }
    };
    q
}
