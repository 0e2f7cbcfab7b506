//! Parameter constraints and their derivation from model metadata.

use crate::config::ResolvedModel;
use crate::schema::FieldType;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NumberBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Named validation rules for one param.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constraint {
    pub presence: bool,
    pub number: Option<NumberBounds>,
    /// Allowed values; array params are checked element-wise.
    pub inclusion: Option<Vec<String>>,
    /// Explicit `null` is rejected rather than treated as absent.
    pub not_null: bool,
    /// Native type validation, skipped when the value is absent.
    pub native: Option<FieldType>,
}

impl Constraint {
    /// No rule; the param is merely allowed.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn presence() -> Self {
        Constraint {
            presence: true,
            ..Default::default()
        }
    }

    pub fn number(min: Option<f64>, max: Option<f64>) -> Self {
        Constraint {
            number: Some(NumberBounds { min, max }),
            ..Default::default()
        }
    }

    pub fn inclusion(values: Vec<String>) -> Self {
        Constraint {
            inclusion: Some(values),
            ..Default::default()
        }
    }
}

pub type Constraints = BTreeMap<String, Constraint>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
}

/// One entry per model field running the field type's native validator.
/// The operation is informational: presence is not derived here.
pub fn derive_for_model(model: &ResolvedModel, operation: Operation) -> Constraints {
    tracing::trace!(model = %model.name, ?operation, "deriving constraints");
    model
        .fields
        .iter()
        .map(|f| {
            let c = Constraint {
                not_null: !f.allow_null,
                native: f.field_type.has_validator().then(|| f.field_type.clone()),
                ..Default::default()
            };
            (f.name.clone(), c)
        })
        .collect()
}

/// `include` must name declared associations.
pub fn include_constraint(model: &ResolvedModel) -> Constraint {
    Constraint::inclusion(model.association_names())
}

/// `scope` must name a declared scope, or be null.
pub fn scope_constraint(model: &ResolvedModel) -> Constraint {
    Constraint::inclusion(model.scope_names())
}
