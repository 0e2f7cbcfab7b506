use crate::actions::{primary_key_constraint, primary_key_value, scoped_view, ActionOutput};
use crate::config::ResolvedModel;
use crate::controller::CrudController;
use crate::error::AppError;
use crate::query::FindOptions;
use crate::service::{derive_for_model, Constraints, Context, Operation};
use crate::store::ModelStore;
use serde_json::{json, Map, Value};

pub fn constraints(model: &ResolvedModel) -> Constraints {
    let mut c = derive_for_model(model, Operation::Update);
    c.insert(model.primary_key.clone(), primary_key_constraint(model));
    c
}

fn not_found(model: &ResolvedModel, key: &Value) -> AppError {
    let mut lookup = Map::new();
    lookup.insert(model.primary_key.clone(), key.clone());
    AppError::ObjectNotFound {
        message: format!("{} not found.", model.name),
        detail: json!({ "where": lookup }),
    }
}

/// Look up through the caller's scope, write every submitted field but the
/// key, then return the row as persisted.
pub async fn process<S: ModelStore>(
    ctrl: &CrudController<S>,
    ctx: &Context,
    mut params: Map<String, Value>,
) -> Result<ActionOutput, AppError> {
    let model = ctrl.model();
    let store = ctrl.store();
    let key = primary_key_value(model, &params);
    let view = scoped_view(ctrl, ctx, &Map::new())?;

    let found = store
        .find_one(&view, &FindOptions::by_key(&model.primary_key, key.clone(), false))
        .await?;
    if found.is_none() {
        return Err(not_found(model, &key));
    }

    params.remove(&model.primary_key);
    store.update(model, &key, &params).await?;
    let mut row = store
        .reload(model, &key, false)
        .await?
        .ok_or_else(|| not_found(model, &key))?;
    ctrl.rules().apply_fields_rule(&mut row, ctx);
    Ok(ActionOutput::Row(Some(row)))
}
