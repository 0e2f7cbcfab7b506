use crate::config::ResolvedModel;
use crate::store::Row;
use serde_json::Value;

/// Shape a row for output. In raw mode to-one includes are flattened into
/// dotted keys (`owner.id`); otherwise they stay nested.
pub fn project(mut row: Row, model: &ResolvedModel, include: &[String], raw: bool) -> Row {
    if !raw {
        return row;
    }
    for name in include {
        let Some(assoc) = model.association(name) else { continue };
        if !assoc.is_to_one() {
            continue;
        }
        if let Some(Value::Object(nested)) = row.remove(name) {
            for (k, v) in nested {
                row.insert(format!("{}.{}", name, k), v);
            }
        } else {
            row.insert(name.clone(), Value::Null);
        }
    }
    row
}
