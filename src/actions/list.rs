use crate::actions::{include_names, scoped_view, ActionOutput};
use crate::config::ResolvedModel;
use crate::controller::CrudController;
use crate::error::{AppError, ValidationErrors};
use crate::query::{parse_order, FindOptions, Predicate};
use crate::service::{include_constraint, scope_constraint, Constraint, Constraints, Context};
use crate::store::ModelStore;
use serde_json::{Map, Value};

pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 1000;
/// Largest offset exactly representable as a JSON number.
pub const MAX_OFFSET: u64 = 9_007_199_254_740_991;

pub fn constraints(model: &ResolvedModel) -> Constraints {
    let mut c = Constraints::new();
    c.insert("where".into(), Constraint::any());
    c.insert("order".into(), Constraint::any());
    c.insert("offset".into(), Constraint::number(Some(0.0), Some(MAX_OFFSET as f64)));
    c.insert("limit".into(), Constraint::number(Some(0.0), Some(MAX_LIMIT as f64)));
    c.insert("include".into(), include_constraint(model));
    c.insert("scope".into(), scope_constraint(model));
    c
}

fn number(params: &Map<String, Value>, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_f64).map(|n| n as u64)
}

pub async fn process<S: ModelStore>(
    ctrl: &CrudController<S>,
    ctx: &Context,
    params: Map<String, Value>,
) -> Result<ActionOutput, AppError> {
    let model = ctrl.model();
    let view = scoped_view(ctrl, ctx, &params)?;

    let predicate = match params.get("where") {
        Some(w) => Predicate::parse(w, &model.fields)
            .map_err(|e| AppError::Validation(ValidationErrors::single("where", e)))?,
        None => Predicate::default(),
    };
    let order = match params.get("order") {
        None | Some(Value::Null) => Vec::new(),
        Some(o) => parse_order(o, &model.fields)
            .map_err(|e| AppError::Validation(ValidationErrors::single("order", e)))?,
    };
    let options = FindOptions {
        predicate,
        order,
        offset: number(&params, "offset").unwrap_or(0),
        // A zero limit falls back to the default.
        limit: Some(number(&params, "limit").filter(|&n| n > 0).unwrap_or(DEFAULT_LIMIT)),
        raw: ctrl.raw(),
        include: include_names(&params),
    };

    let mut result = ctrl.store().find_and_count_all(&view, &options).await?;
    ctrl.rules().apply_fields_rule(&mut result.rows, ctx);
    Ok(ActionOutput::List(result))
}
