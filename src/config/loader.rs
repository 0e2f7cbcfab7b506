//! Load config from a JSON file and resolve it into a runtime model.

use crate::case::to_snake_case;
use crate::config::resolved::{AssociationSpec, FieldDescriptor, JoinTable, ResolvedModel, ScopeSpec, TableRef};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::query::Predicate;
use crate::schema::FieldType;
use std::collections::HashSet;
use std::path::Path;

/// Build the resolved model from its config (validates first).
pub fn resolve(config: &ModelConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let column_name = |attr: &str| {
        if config.underscored {
            to_snake_case(attr)
        } else {
            attr.to_string()
        }
    };
    let read_only: HashSet<&str> = config.read_only.iter().map(String::as_str).collect();

    let mut fields = Vec::with_capacity(config.fields.len() + 4);
    if !config.fields.iter().any(|f| f.primary_key) {
        fields.push(FieldDescriptor {
            name: "id".into(),
            column: "id".into(),
            field_type: FieldType::Integer,
            allow_null: false,
            default_value: None,
            comment: None,
            primary_key: true,
            auto_increment: true,
            read_only: read_only.contains("id"),
        });
    }
    for f in &config.fields {
        let field_type = FieldType::parse(&f.type_, f.length, &f.values).ok_or_else(|| ConfigError::UnknownType {
            field: f.name.clone(),
            type_name: f.type_.clone(),
        })?;
        if let FieldType::Enum { values } = &field_type {
            if values.is_empty() {
                return Err(ConfigError::Validation(format!("enum field {} has no values", f.name)));
            }
        }
        if f.auto_increment && !field_type.is_integer() {
            return Err(ConfigError::Validation(format!(
                "auto_increment field {} must be an integer type",
                f.name
            )));
        }
        fields.push(FieldDescriptor {
            name: f.name.clone(),
            column: f.column.clone().unwrap_or_else(|| column_name(&f.name)),
            field_type,
            allow_null: f.allow_null && !f.primary_key,
            default_value: f.default.clone(),
            comment: f.comment.clone(),
            primary_key: f.primary_key,
            auto_increment: f.auto_increment,
            read_only: read_only.contains(f.name.as_str()),
        });
    }

    let mut timestamp = |name: &str, allow_null: bool| -> String {
        match fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.read_only = true,
            None => fields.push(FieldDescriptor {
                name: name.to_string(),
                column: column_name(name),
                field_type: FieldType::Date,
                allow_null,
                default_value: None,
                comment: None,
                primary_key: false,
                auto_increment: false,
                read_only: true,
            }),
        }
        name.to_string()
    };
    let (created_at, updated_at) = if config.timestamps {
        (Some(timestamp("createdAt", false)), Some(timestamp("updatedAt", false)))
    } else {
        (None, None)
    };
    let deleted_at = config.paranoid.then(|| timestamp("deletedAt", true));

    let has_field = |name: &str| fields.iter().any(|f| f.name == name);
    for name in &config.read_only {
        if !has_field(name) {
            return Err(ConfigError::MissingReference {
                kind: "read-only field",
                id: name.clone(),
            });
        }
    }
    for group in &config.unique {
        for name in group {
            if !has_field(name) {
                return Err(ConfigError::MissingReference {
                    kind: "unique field",
                    id: name.clone(),
                });
            }
        }
    }

    let primary_key = fields
        .iter()
        .find(|f| f.primary_key)
        .map(|f| f.name.clone())
        .ok_or_else(|| ConfigError::InvalidPrimaryKey {
            model: config.name.clone(),
            field: "id".into(),
        })?;

    let mut scopes = Vec::with_capacity(config.scopes.len());
    for s in &config.scopes {
        let predicate = match &s.where_ {
            Some(w) => Predicate::parse(w, &fields)
                .map_err(|e| ConfigError::Validation(format!("scope {}: where {}", s.name, e)))?,
            None => Predicate::default(),
        };
        scopes.push(ScopeSpec {
            name: s.name.clone(),
            predicate,
            include_deleted: s.include_deleted,
        });
    }

    let mut associations = Vec::with_capacity(config.associations.len());
    for a in &config.associations {
        associations.push(resolve_association(a, &primary_key, &has_field)?);
    }

    Ok(ResolvedModel {
        name: config.name.clone(),
        table: TableRef {
            schema: config.schema.clone(),
            name: config.table.clone().unwrap_or_else(|| config.name.clone()),
        },
        fields,
        primary_key,
        scopes,
        associations,
        unique: config.unique.clone(),
        created_at,
        updated_at,
        deleted_at,
    })
}

fn resolve_association(
    a: &AssociationConfig,
    primary_key: &str,
    has_field: &dyn Fn(&str) -> bool,
) -> Result<AssociationSpec, ConfigError> {
    let (local_key, remote_key) = match a.kind {
        AssociationKind::BelongsTo => (
            a.local_key.clone().unwrap_or_else(|| format!("{}Id", a.name)),
            a.remote_key.clone().unwrap_or_else(|| "id".into()),
        ),
        AssociationKind::HasOne | AssociationKind::HasMany => (
            a.local_key.clone().unwrap_or_else(|| primary_key.to_string()),
            a.remote_key.clone().ok_or_else(|| ConfigError::MissingReference {
                kind: "association remote_key",
                id: a.name.clone(),
            })?,
        ),
        AssociationKind::BelongsToMany => (
            a.local_key.clone().unwrap_or_else(|| primary_key.to_string()),
            a.remote_key.clone().unwrap_or_else(|| "id".into()),
        ),
    };
    if !has_field(&local_key) {
        return Err(ConfigError::MissingReference {
            kind: "association local_key",
            id: format!("{}.{}", a.name, local_key),
        });
    }
    Ok(AssociationSpec {
        name: a.name.clone(),
        kind: a.kind,
        target: TableRef {
            schema: a.target_schema.clone(),
            name: a.target.clone(),
        },
        local_key,
        remote_key,
        through: a.through.as_ref().map(|t| JoinTable {
            table: TableRef {
                schema: t.schema.clone(),
                name: t.table.clone(),
            },
            local_key: t.local_key.clone(),
            remote_key: t.remote_key.clone(),
        }),
    })
}

pub fn from_json_str(s: &str) -> Result<CrudConfig, ConfigError> {
    serde_json::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read a controller config file (`{ "model": .., "rules": .., "options": .. }`).
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<CrudConfig, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "loaded model config");
    from_json_str(&text)
}
