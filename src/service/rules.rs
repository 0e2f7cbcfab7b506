//! Role rules: scope narrowing on the way in, field redaction on the way out.
//!
//! Rules are opt-in allow-listing. A caller without a role, or whose role no
//! rule lists, sees the unscoped model and every field.

use crate::config::{ResolvedModel, RuleConfig};
use crate::error::ConfigError;
use crate::store::{ModelView, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Per-request caller identity. Only the role is read by the core.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Context {
    pub fn with_role(role: impl Into<String>) -> Self {
        Context {
            role: Some(role.into()),
            extra: Map::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Anything a role can be read from: a role string or a request context.
pub trait RoleSource {
    fn role(&self) -> Option<&str>;
}

impl RoleSource for str {
    fn role(&self) -> Option<&str> {
        Some(self)
    }
}

impl RoleSource for String {
    fn role(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl RoleSource for Context {
    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

impl<T: RoleSource + ?Sized> RoleSource for Option<&T> {
    fn role(&self) -> Option<&str> {
        match self {
            Some(r) => r.role(),
            None => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub roles: HashSet<String>,
    pub restricted_fields: HashSet<String>,
    pub scope: Option<String>,
}

/// Rows (or collections of rows) that can have restricted keys stripped.
pub trait Redact {
    fn redact(&mut self, fields: &HashSet<String>);
}

impl Redact for Row {
    /// Flattened include keys (`owner.id`) go with their association.
    fn redact(&mut self, fields: &HashSet<String>) {
        self.retain(|k, _| {
            let head = k.split_once('.').map(|(head, _)| head).unwrap_or(k);
            !fields.contains(k) && !fields.contains(head)
        });
    }
}

impl<T: Redact> Redact for Vec<T> {
    fn redact(&mut self, fields: &HashSet<String>) {
        for item in self.iter_mut() {
            item.redact(fields);
        }
    }
}

impl<T: Redact> Redact for Option<T> {
    fn redact(&mut self, fields: &HashSet<String>) {
        if let Some(inner) = self {
            inner.redact(fields);
        }
    }
}

impl Redact for Value {
    fn redact(&mut self, fields: &HashSet<String>) {
        match self {
            Value::Object(map) => map.redact(fields),
            Value::Array(items) => items.redact(fields),
            _ => {}
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build from config. Scopes must exist on the model; restricted names must be fields or associations.
    pub fn new(configs: &[RuleConfig], model: &ResolvedModel) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(configs.len());
        for c in configs {
            if let Some(scope) = &c.scope {
                if model.scope(scope).is_none() {
                    return Err(ConfigError::MissingReference {
                        kind: "rule scope",
                        id: scope.clone(),
                    });
                }
            }
            for f in &c.restricted_fields {
                if model.field(f).is_none() && model.association(f).is_none() {
                    return Err(ConfigError::MissingReference {
                        kind: "restricted field",
                        id: f.clone(),
                    });
                }
            }
            rules.push(Rule {
                roles: c.roles.iter().cloned().collect(),
                restricted_fields: c.restricted_fields.iter().cloned().collect(),
                scope: c.scope.clone(),
            });
        }
        Ok(RuleSet { rules })
    }

    /// First rule listing the role.
    pub fn find<R: RoleSource + ?Sized>(&self, role: &R) -> Option<&Rule> {
        let role = role.role()?;
        self.rules.iter().find(|r| r.roles.contains(role))
    }

    pub fn apply_scope_rule<'m, R: RoleSource + ?Sized>(&self, view: ModelView<'m>, role: &R) -> ModelView<'m> {
        let Some(scope) = self.find(role).and_then(|r| r.scope.as_deref()) else {
            return view;
        };
        match view.clone().scope(scope) {
            Some(narrowed) => narrowed,
            None => {
                tracing::warn!(model = %view.model().name, scope, "rule names an unknown scope; leaving model unscoped");
                view
            }
        }
    }

    pub fn apply_fields_rule<T: Redact + ?Sized, R: RoleSource + ?Sized>(&self, target: &mut T, role: &R) {
        if let Some(rule) = self.find(role) {
            if !rule.restricted_fields.is_empty() {
                target.redact(&rule.restricted_fields);
            }
        }
    }
}
