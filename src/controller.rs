//! CRUD controller: one model bound to a store, its rules and options, with
//! the five actions registered under fixed names.

use crate::actions::{ActionName, ActionOutput};
use crate::config::{ControllerOptions, CrudConfig, ResolvedModel};
use crate::error::AppError;
use crate::service::{Context, ParamsValidator, RuleSet};
use crate::store::{ModelStore, Row};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct CrudController<S> {
    model: Arc<ResolvedModel>,
    store: Arc<S>,
    rules: RuleSet,
    options: ControllerOptions,
}

impl<S: ModelStore> CrudController<S> {
    pub fn new(model: ResolvedModel, store: Arc<S>, rules: RuleSet, options: ControllerOptions) -> Self {
        CrudController {
            model: Arc::new(model),
            store,
            rules,
            options,
        }
    }

    /// Resolve the model and its rules from config.
    pub fn from_config(config: &CrudConfig, store: Arc<S>) -> Result<Self, AppError> {
        let model = crate::config::resolve(&config.model)?;
        let rules = RuleSet::new(&config.rules, &model)?;
        tracing::debug!(model = %model.name, rules = config.rules.len(), "controller registered");
        Ok(Self::new(model, store, rules, config.options))
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    /// Whether reads use the raw projection.
    pub fn raw(&self) -> bool {
        !self.options.disable_raw_option
    }

    /// Look up the action, validate `params` against its constraints, run it.
    pub async fn call_action(
        &self,
        ctx: &Context,
        name: &str,
        params: Map<String, Value>,
    ) -> Result<ActionOutput, AppError> {
        let action: ActionName = name.parse()?;
        tracing::debug!(model = %self.model.name, action = %action, role = ?ctx.role, "call action");
        let constraints = action.constraints(&self.model);
        ParamsValidator::validate(&params, &constraints)?;
        action.process(self, ctx, params).await
    }

    /// Field descriptors keyed by attribute name, with the caller's
    /// restricted fields removed.
    pub fn get_model_fields(&self, ctx: &Context, exclude_read_only: bool) -> Row {
        let mut out = Row::new();
        for f in &self.model.fields {
            if exclude_read_only && f.read_only {
                continue;
            }
            let mut d = Map::new();
            d.insert("type".into(), Value::String(f.field_type.type_name().into()));
            d.insert("allowNull".into(), Value::Bool(f.allow_null));
            if let Some(comment) = &f.comment {
                d.insert("comment".into(), Value::String(comment.clone()));
            }
            if let Some(default) = &f.default_value {
                d.insert("defaultValue".into(), default.clone());
            }
            match &f.field_type {
                crate::schema::FieldType::String { length } => {
                    d.insert("length".into(), Value::from(*length));
                }
                crate::schema::FieldType::Enum { values } => {
                    d.insert("values".into(), Value::from(values.clone()));
                }
                _ => {}
            }
            d.insert("primaryKey".into(), Value::Bool(f.primary_key));
            out.insert(f.name.clone(), Value::Object(d));
        }
        self.rules.apply_fields_rule(&mut out, ctx);
        out
    }
}
