//! Dispatch support: constraint derivation, params validation, role rules.

mod constraints;
mod rules;
mod validation;

pub use constraints::{derive_for_model, include_constraint, scope_constraint, Constraint, Constraints, NumberBounds, Operation};
pub use rules::{Context, Redact, RoleSource, Rule, RuleSet};
pub use validation::ParamsValidator;
