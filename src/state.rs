//! Shared application state for the CRUD routes.

use crate::controller::CrudController;
use std::sync::Arc;

pub struct CrudState<S> {
    pub controller: Arc<CrudController<S>>,
}

impl<S> CrudState<S> {
    pub fn new(controller: CrudController<S>) -> Self {
        CrudState {
            controller: Arc::new(controller),
        }
    }
}

impl<S> Clone for CrudState<S> {
    fn clone(&self) -> Self {
        CrudState {
            controller: Arc::clone(&self.controller),
        }
    }
}
