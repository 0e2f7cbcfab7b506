//! The five CRUD actions. Each module exposes `constraints` (the params it
//! accepts) and `process` (the work after params have been validated).

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;

use crate::config::ResolvedModel;
use crate::controller::CrudController;
use crate::error::{AppError, ValidationErrors};
use crate::service::{Constraint, Constraints, Context};
use crate::store::{ModelStore, ModelView, Row, RowsAndCount};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionName {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl ActionName {
    pub const ALL: [ActionName; 5] = [
        ActionName::List,
        ActionName::Get,
        ActionName::Create,
        ActionName::Update,
        ActionName::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::List => "list",
            ActionName::Get => "get",
            ActionName::Create => "create",
            ActionName::Update => "update",
            ActionName::Delete => "delete",
        }
    }

    /// Params accepted by this action for `model`.
    pub fn constraints(&self, model: &ResolvedModel) -> Constraints {
        match self {
            ActionName::List => list::constraints(model),
            ActionName::Get => get::constraints(model),
            ActionName::Create => create::constraints(model),
            ActionName::Update => update::constraints(model),
            ActionName::Delete => delete::constraints(model),
        }
    }

    pub async fn process<S: ModelStore>(
        &self,
        ctrl: &CrudController<S>,
        ctx: &Context,
        params: Map<String, Value>,
    ) -> Result<ActionOutput, AppError> {
        match self {
            ActionName::List => list::process(ctrl, ctx, params).await,
            ActionName::Get => get::process(ctrl, ctx, params).await,
            ActionName::Create => create::process(ctrl, ctx, params).await,
            ActionName::Update => update::process(ctrl, ctx, params).await,
            ActionName::Delete => delete::process(ctrl, ctx, params).await,
        }
    }
}

impl FromStr for ActionName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AppError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful action.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    /// `{rows, count}`
    List(RowsAndCount),
    /// A row, or `null` when Get finds nothing.
    Row(Option<Row>),
    /// `{count}`
    Deleted { count: u64 },
}

impl ActionOutput {
    pub fn into_row(self) -> Option<Row> {
        match self {
            ActionOutput::Row(row) => row,
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<RowsAndCount> {
        match self {
            ActionOutput::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn deleted_count(&self) -> Option<u64> {
        match self {
            ActionOutput::Deleted { count } => Some(*count),
            _ => None,
        }
    }
}

/// Primary key param: required and type-checked.
pub(crate) fn primary_key_constraint(model: &ResolvedModel) -> Constraint {
    let pk = model.primary_key_field();
    Constraint {
        native: pk.field_type.has_validator().then(|| pk.field_type.clone()),
        ..Constraint::presence()
    }
}

pub(crate) fn primary_key_value(model: &ResolvedModel, params: &Map<String, Value>) -> Value {
    params.get(&model.primary_key).cloned().unwrap_or(Value::Null)
}

/// `include` as a list of association names; a single string is one name.
pub(crate) fn include_names(params: &Map<String, Value>) -> Vec<String> {
    match params.get("include") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}

/// The caller's role scope, further narrowed by a requested `scope` param.
pub(crate) fn scoped_view<'m, S: ModelStore>(
    ctrl: &'m CrudController<S>,
    ctx: &Context,
    params: &Map<String, Value>,
) -> Result<ModelView<'m>, AppError> {
    let view = ctrl.rules().apply_scope_rule(ModelView::new(ctrl.model()), ctx);
    match params.get("scope").and_then(Value::as_str) {
        Some(name) => view.scope(name).ok_or_else(|| {
            AppError::Validation(ValidationErrors::single(
                "scope",
                format!("{} is not included in the list", Value::String(name.to_string())),
            ))
        }),
        None => Ok(view),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_unknown_is_an_error() {
        for a in ActionName::ALL {
            assert_eq!(a.as_str().parse::<ActionName>().unwrap(), a);
        }
        let err = "purge".parse::<ActionName>().unwrap_err();
        assert_eq!(err.kind(), "UNKNOWN_ACTION");
    }

    #[test]
    fn outputs_serialize_flat() {
        let out = ActionOutput::Deleted { count: 2 };
        assert_eq!(serde_json::to_value(&out).unwrap(), serde_json::json!({"count": 2}));
        assert_eq!(serde_json::to_value(ActionOutput::Row(None)).unwrap(), Value::Null);
    }
}
