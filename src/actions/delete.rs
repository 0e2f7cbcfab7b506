use crate::actions::{primary_key_constraint, primary_key_value, ActionOutput};
use crate::config::ResolvedModel;
use crate::controller::CrudController;
use crate::error::AppError;
use crate::query::Predicate;
use crate::service::{Constraints, Context};
use crate::store::{ModelStore, ModelView};
use serde_json::{Map, Value};

pub fn constraints(model: &ResolvedModel) -> Constraints {
    let mut c = Constraints::new();
    c.insert(model.primary_key.clone(), primary_key_constraint(model));
    c
}

/// The role scope joins the delete predicate only with `scope_deletes`.
pub async fn process<S: ModelStore>(
    ctrl: &CrudController<S>,
    ctx: &Context,
    params: Map<String, Value>,
) -> Result<ActionOutput, AppError> {
    let model = ctrl.model();
    let view = if ctrl.options().scope_deletes {
        ctrl.rules().apply_scope_rule(ModelView::new(model), ctx)
    } else {
        ModelView::new(model)
    };
    let predicate = Predicate::eq(&model.primary_key, primary_key_value(model, &params));
    let count = ctrl.store().destroy(&view, &predicate).await?;
    Ok(ActionOutput::Deleted { count })
}
