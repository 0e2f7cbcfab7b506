//! Query options handed to a store: predicate, order, paging, includes.

mod order;
mod predicate;

pub use order::{parse_order, Direction, OrderBy};
pub use predicate::{compare_values, values_equal, CompareOp, Predicate};

#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub predicate: Predicate,
    pub order: Vec<OrderBy>,
    pub offset: u64,
    pub limit: Option<u64>,
    /// Plain projection: to-one includes flattened into dotted keys.
    pub raw: bool,
    pub include: Vec<String>,
}

impl FindOptions {
    pub fn by_key(field: &str, value: serde_json::Value, raw: bool) -> Self {
        FindOptions {
            predicate: Predicate::eq(field, value),
            raw,
            ..Default::default()
        }
    }
}
