//! Semantic field types used by model descriptors.

mod field_type;

pub use field_type::{parse_date, FieldType};
