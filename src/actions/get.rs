use crate::actions::{include_names, primary_key_constraint, primary_key_value, scoped_view, ActionOutput};
use crate::config::ResolvedModel;
use crate::controller::CrudController;
use crate::error::AppError;
use crate::query::FindOptions;
use crate::service::{include_constraint, scope_constraint, Constraints, Context};
use crate::store::ModelStore;
use serde_json::{Map, Value};

pub fn constraints(model: &ResolvedModel) -> Constraints {
    let mut c = Constraints::new();
    c.insert(model.primary_key.clone(), primary_key_constraint(model));
    c.insert("include".into(), include_constraint(model));
    c.insert("scope".into(), scope_constraint(model));
    c
}

/// A missing row is `null`, not an error.
pub async fn process<S: ModelStore>(
    ctrl: &CrudController<S>,
    ctx: &Context,
    params: Map<String, Value>,
) -> Result<ActionOutput, AppError> {
    let model = ctrl.model();
    let view = scoped_view(ctrl, ctx, &params)?;
    let options = FindOptions {
        include: include_names(&params),
        ..FindOptions::by_key(&model.primary_key, primary_key_value(model, &params), ctrl.raw())
    };
    let mut row = ctrl.store().find_one(&view, &options).await?;
    ctrl.rules().apply_fields_rule(&mut row, ctx);
    Ok(ActionOutput::Row(row))
}
