//! In-memory store. Tables are keyed by table name; model rows are kept by
//! attribute name, related tables as seeded.

use crate::config::{AssociationKind, AssociationSpec, ResolvedModel};
use crate::error::AppError;
use crate::query::{compare_values, values_equal, Direction, FindOptions, OrderBy, Predicate};
use crate::schema::FieldType;
use crate::store::{project, ModelStore, ModelView, Row, RowsAndCount};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Row>>,
    sequences: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table as-is (association targets, join tables).
    pub fn insert_rows(&self, table: &str, rows: Vec<Row>) -> Result<(), AppError> {
        self.write()?.rows.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    /// Append fixture rows to the model's own table, bypassing defaults and
    /// timestamps. Integer keys advance the auto-increment sequence.
    pub fn seed(&self, model: &ResolvedModel, rows: Vec<Row>) -> Result<(), AppError> {
        let key = model.table.key();
        let mut tables = self.write()?;
        let max = rows
            .iter()
            .filter_map(|r| r.get(&model.primary_key).and_then(Value::as_i64))
            .max();
        if let Some(max) = max {
            let seq = tables.sequences.entry(key.clone()).or_insert(0);
            *seq = (*seq).max(max);
        }
        tables.rows.entry(key).or_default().extend(rows);
        Ok(())
    }

    /// Snapshot of a table, including soft-deleted rows.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>, AppError> {
        Ok(self.read()?.rows.get(table).cloned().unwrap_or_default())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::Persistence("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::Persistence("memory store lock poisoned".into()))
    }
}

fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
}

fn is_live(model: &ResolvedModel, row: &Row) -> bool {
    match &model.deleted_at {
        Some(f) => row.get(f).map(Value::is_null).unwrap_or(true),
        None => true,
    }
}

fn select(tables: &Tables, view: &ModelView<'_>, options: &FindOptions) -> Vec<Row> {
    let model = view.model();
    let predicate = view.predicate().and(options.predicate.clone());
    let include_deleted = view.include_deleted();
    let mut rows: Vec<Row> = tables
        .rows
        .get(&model.table.key())
        .map(|rows| {
            rows.iter()
                .filter(|r| (include_deleted || is_live(model, r)) && predicate.matches(r))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let default_order = [OrderBy::asc(model.primary_key.clone())];
    let order: &[OrderBy] = if options.order.is_empty() {
        &default_order
    } else {
        &options.order
    };
    rows.sort_by(|a, b| compare_rows(a, b, order));
    rows
}

/// Nulls sort last ascending, first descending.
fn compare_rows(a: &Row, b: &Row, order: &[OrderBy]) -> Ordering {
    for term in order {
        let x = a.get(&term.field).unwrap_or(&Value::Null);
        let y = b.get(&term.field).unwrap_or(&Value::Null);
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        let ord = match term.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn attach_includes(tables: &Tables, model: &ResolvedModel, row: &mut Row, include: &[String]) {
    for name in include {
        let Some(assoc) = model.association(name) else { continue };
        let value = related(tables, assoc, row.get(&assoc.local_key).unwrap_or(&Value::Null));
        row.insert(name.clone(), value);
    }
}

fn related(tables: &Tables, assoc: &AssociationSpec, local: &Value) -> Value {
    let empty = Vec::new();
    let targets = tables.rows.get(&assoc.target.key()).unwrap_or(&empty);
    let remote_key = assoc.remote_key.as_str();
    match assoc.kind {
        AssociationKind::BelongsTo | AssociationKind::HasOne => matching(targets, remote_key, local)
            .next()
            .map(|t| Value::Object(t.clone()))
            .unwrap_or(Value::Null),
        AssociationKind::HasMany => Value::Array(matching(targets, remote_key, local).map(|t| Value::Object(t.clone())).collect()),
        AssociationKind::BelongsToMany => {
            let Some(through) = &assoc.through else {
                return Value::Array(Vec::new());
            };
            let joins = tables.rows.get(&through.table.key()).unwrap_or(&empty);
            let mut out = Vec::new();
            for j in joins {
                if local.is_null() || !values_equal(j.get(&through.local_key).unwrap_or(&Value::Null), local) {
                    continue;
                }
                let remote = j.get(&through.remote_key).unwrap_or(&Value::Null);
                out.extend(matching(targets, remote_key, remote).map(|t| Value::Object(t.clone())));
            }
            Value::Array(out)
        }
    }
}

fn matching<'a>(targets: &'a [Row], remote_key: &'a str, key: &'a Value) -> impl Iterator<Item = &'a Row> + 'a {
    targets
        .iter()
        .filter(move |t| !key.is_null() && values_equal(t.get(remote_key).unwrap_or(&Value::Null), key))
}

fn check_not_null(model: &ResolvedModel, row: &Row) -> Result<(), AppError> {
    for f in &model.fields {
        if !f.allow_null && row.get(&f.name).map(Value::is_null).unwrap_or(true) {
            return Err(AppError::Persistence(format!(
                "null value in column \"{}\" violates not-null constraint",
                f.column
            )));
        }
    }
    Ok(())
}

fn check_unique(model: &ResolvedModel, rows: &[Row], candidate: &Row, skip: Option<usize>) -> Result<(), AppError> {
    let pk = vec![model.primary_key.clone()];
    for group in std::iter::once(&pk).chain(model.unique.iter()) {
        let values: Vec<&Value> = group
            .iter()
            .map(|f| candidate.get(f).unwrap_or(&Value::Null))
            .collect();
        if values.iter().any(|v| v.is_null()) {
            continue;
        }
        let clash = rows.iter().enumerate().any(|(i, r)| {
            Some(i) != skip
                && group
                    .iter()
                    .zip(&values)
                    .all(|(f, v)| values_equal(r.get(f).unwrap_or(&Value::Null), v))
        });
        if clash {
            return Err(AppError::Conflict(format!(
                "duplicate key value violates unique constraint on ({})",
                group.join(", ")
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn find_and_count_all(&self, view: &ModelView<'_>, options: &FindOptions) -> Result<RowsAndCount, AppError> {
        let tables = self.read()?;
        let model = view.model();
        let all = select(&tables, view, options);
        let count = all.len() as u64;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let rows = all
            .into_iter()
            .skip(options.offset as usize)
            .take(limit)
            .map(|mut r| {
                attach_includes(&tables, model, &mut r, &options.include);
                project(r, model, &options.include, options.raw)
            })
            .collect();
        Ok(RowsAndCount { rows, count })
    }

    async fn find_one(&self, view: &ModelView<'_>, options: &FindOptions) -> Result<Option<Row>, AppError> {
        let tables = self.read()?;
        let model = view.model();
        Ok(select(&tables, view, options).into_iter().next().map(|mut r| {
            attach_includes(&tables, model, &mut r, &options.include);
            project(r, model, &options.include, options.raw)
        }))
    }

    async fn create(&self, model: &ResolvedModel, fields: &Row) -> Result<Row, AppError> {
        let mut tables = self.write()?;
        let key = model.table.key();
        let mut row = Row::new();
        for f in &model.fields {
            let value = match fields.get(&f.name) {
                Some(v) => v.clone(),
                None => f.default_value.clone().unwrap_or(Value::Null),
            };
            row.insert(f.name.clone(), value);
        }
        let pk = model.primary_key_field();
        if row.get(&pk.name).map(Value::is_null).unwrap_or(true) {
            if pk.auto_increment {
                let seq = tables.sequences.entry(key.clone()).or_insert(0);
                *seq += 1;
                row.insert(pk.name.clone(), Value::from(*seq));
            } else if pk.field_type == FieldType::Uuid {
                row.insert(pk.name.clone(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
        } else if let Some(n) = row.get(&pk.name).and_then(Value::as_i64) {
            let seq = tables.sequences.entry(key.clone()).or_insert(0);
            *seq = (*seq).max(n);
        }
        let ts = now();
        for f in [&model.created_at, &model.updated_at].into_iter().flatten() {
            row.insert(f.clone(), ts.clone());
        }
        check_not_null(model, &row)?;
        let table = tables.rows.entry(key).or_default();
        check_unique(model, table, &row, None)?;
        table.push(row.clone());
        tracing::debug!(model = %model.name, "memory insert");
        Ok(row)
    }

    async fn update(&self, model: &ResolvedModel, key: &Value, fields: &Row) -> Result<(), AppError> {
        let mut tables = self.write()?;
        let table = tables.rows.entry(model.table.key()).or_default();
        let idx = table
            .iter()
            .position(|r| values_equal(r.get(&model.primary_key).unwrap_or(&Value::Null), key))
            .ok_or_else(|| AppError::Persistence(format!("{} row {} vanished before update", model.name, key)))?;
        let mut next = table[idx].clone();
        for (k, v) in fields {
            if *k != model.primary_key && model.field(k).is_some() {
                next.insert(k.clone(), v.clone());
            }
        }
        if let Some(f) = &model.updated_at {
            next.insert(f.clone(), now());
        }
        check_not_null(model, &next)?;
        check_unique(model, table, &next, Some(idx))?;
        table[idx] = next;
        Ok(())
    }

    async fn reload(&self, model: &ResolvedModel, key: &Value, paranoid: bool) -> Result<Option<Row>, AppError> {
        let tables = self.read()?;
        Ok(tables.rows.get(&model.table.key()).and_then(|rows| {
            rows.iter()
                .find(|r| {
                    values_equal(r.get(&model.primary_key).unwrap_or(&Value::Null), key)
                        && (!paranoid || is_live(model, r))
                })
                .cloned()
        }))
    }

    async fn destroy(&self, view: &ModelView<'_>, predicate: &Predicate) -> Result<u64, AppError> {
        let mut tables = self.write()?;
        let model = view.model();
        let predicate = view.predicate().and(predicate.clone());
        let Some(table) = tables.rows.get_mut(&model.table.key()) else {
            return Ok(0);
        };
        match &model.deleted_at {
            Some(deleted_at) => {
                let ts = now();
                let mut count = 0;
                for r in table.iter_mut() {
                    if is_live(model, r) && predicate.matches(r) {
                        r.insert(deleted_at.clone(), ts.clone());
                        count += 1;
                    }
                }
                Ok(count)
            }
            None => {
                let before = table.len();
                table.retain(|r| !predicate.matches(r));
                Ok((before - table.len()) as u64)
            }
        }
    }
}
