//! Resolved model: config validated and flattened for runtime use.

use crate::config::AssociationKind;
use crate::query::Predicate;
use crate::schema::FieldType;

/// Possibly schema-qualified table name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    /// Key used by stores that address tables without quoting.
    pub fn key(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    /// Attribute name used in params and results.
    pub name: String,
    /// Column name in the backing table.
    pub column: String,
    pub field_type: FieldType,
    pub allow_null: bool,
    pub default_value: Option<serde_json::Value>,
    pub comment: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub read_only: bool,
}

#[derive(Clone, Debug)]
pub struct ScopeSpec {
    pub name: String,
    pub predicate: Predicate,
    pub include_deleted: bool,
}

#[derive(Clone, Debug)]
pub struct JoinTable {
    pub table: TableRef,
    pub local_key: String,
    pub remote_key: String,
}

/// Join-relation descriptor for one association.
#[derive(Clone, Debug)]
pub struct AssociationSpec {
    pub name: String,
    pub kind: AssociationKind,
    pub target: TableRef,
    /// Attribute on this model.
    pub local_key: String,
    /// Column on the target table.
    pub remote_key: String,
    pub through: Option<JoinTable>,
}

impl AssociationSpec {
    pub fn is_to_one(&self) -> bool {
        matches!(self.kind, AssociationKind::BelongsTo | AssociationKind::HasOne)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub name: String,
    pub table: TableRef,
    /// Fields in declaration order; timestamps last.
    pub fields: Vec<FieldDescriptor>,
    pub primary_key: String,
    pub scopes: Vec<ScopeSpec>,
    pub associations: Vec<AssociationSpec>,
    /// Unique constraints as attribute-name groups.
    pub unique: Vec<Vec<String>>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Present when the model soft-deletes.
    pub deleted_at: Option<String>,
}

impl ResolvedModel {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key_field(&self) -> &FieldDescriptor {
        // resolve() guarantees the primary key is one of the fields
        self.fields
            .iter()
            .find(|f| f.name == self.primary_key)
            .unwrap_or(&self.fields[0])
    }

    pub fn column_for(&self, attribute: &str) -> Option<&str> {
        self.field(attribute).map(|f| f.column.as_str())
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeSpec> {
        self.scopes.iter().find(|s| s.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&AssociationSpec> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn scope_names(&self) -> Vec<String> {
        self.scopes.iter().map(|s| s.name.clone()).collect()
    }

    pub fn association_names(&self) -> Vec<String> {
        self.associations.iter().map(|a| a.name.clone()).collect()
    }

    pub fn is_paranoid(&self) -> bool {
        self.deleted_at.is_some()
    }
}
