use crate::config::{ResolvedModel, ScopeSpec};
use crate::query::Predicate;

/// A model narrowed by zero or more named scopes.
#[derive(Clone, Debug)]
pub struct ModelView<'m> {
    model: &'m ResolvedModel,
    scopes: Vec<&'m ScopeSpec>,
}

impl<'m> ModelView<'m> {
    pub fn new(model: &'m ResolvedModel) -> Self {
        ModelView {
            model,
            scopes: Vec::new(),
        }
    }

    pub fn model(&self) -> &'m ResolvedModel {
        self.model
    }

    /// Narrow by a declared scope; `None` if the model has no such scope.
    pub fn scope(mut self, name: &str) -> Option<Self> {
        let spec = self.model.scope(name)?;
        if !self.scopes.iter().any(|s| s.name == spec.name) {
            self.scopes.push(spec);
        }
        Some(self)
    }

    pub fn scope_names(&self) -> Vec<&str> {
        self.scopes.iter().map(|s| s.name.as_str()).collect()
    }

    /// Conjunction of every applied scope's `where`.
    pub fn predicate(&self) -> Predicate {
        self.scopes
            .iter()
            .fold(Predicate::default(), |acc, s| acc.and(s.predicate.clone()))
    }

    /// True when some applied scope lifts the soft-delete filter.
    pub fn include_deleted(&self) -> bool {
        self.scopes.iter().any(|s| s.include_deleted)
    }
}
