//! Raw config types as read from the model config file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One controller's worth of configuration: the model, its rule table and controller options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrudConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub options: ControllerOptions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Defaults to `name`.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Soft delete through a `deletedAt` timestamp.
    #[serde(default)]
    pub paranoid: bool,
    /// Attribute names in camelCase map to snake_case columns.
    #[serde(default)]
    pub underscored: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Type name, e.g. "STRING", "STRING(64)", "INTEGER", "ENUM".
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Explicit column name; otherwise derived from the attribute name.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    #[serde(default, rename = "where")]
    pub where_: Option<Value>,
    /// Lift the soft-delete filter for queries through this scope.
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub name: String,
    pub kind: AssociationKind,
    /// Target table name.
    pub target: String,
    #[serde(default)]
    pub target_schema: Option<String>,
    /// Attribute on this model used in the join.
    #[serde(default)]
    pub local_key: Option<String>,
    /// Column on the target used in the join.
    #[serde(default)]
    pub remote_key: Option<String>,
    #[serde(default)]
    pub through: Option<ThroughConfig>,
}

/// Join table for many-to-many associations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThroughConfig {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// Join-table column referencing this model.
    pub local_key: String,
    /// Join-table column referencing the target.
    pub remote_key: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    pub roles: Vec<String>,
    #[serde(default)]
    pub restricted_fields: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ControllerOptions {
    /// Return engine-shaped rows (nested includes) instead of the raw projection.
    #[serde(default)]
    pub disable_raw_option: bool,
    /// Apply the caller's role scope to the delete predicate.
    #[serde(default)]
    pub scope_deletes: bool,
}

fn default_true() -> bool {
    true
}
