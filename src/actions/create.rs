use crate::actions::ActionOutput;
use crate::config::ResolvedModel;
use crate::controller::CrudController;
use crate::error::AppError;
use crate::service::{derive_for_model, Constraints, Context, Operation};
use crate::store::ModelStore;
use serde_json::{Map, Value};

pub fn constraints(model: &ResolvedModel) -> Constraints {
    derive_for_model(model, Operation::Create)
}

pub async fn process<S: ModelStore>(
    ctrl: &CrudController<S>,
    ctx: &Context,
    params: Map<String, Value>,
) -> Result<ActionOutput, AppError> {
    let mut row = ctrl.store().create(ctrl.model(), &params).await?;
    ctrl.rules().apply_fields_rule(&mut row, ctx);
    Ok(ActionOutput::Row(Some(row)))
}
