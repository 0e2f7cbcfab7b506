//! Parameter encoding: values bind as text and are cast in SQL (`$n::type`).

use crate::schema::FieldType;
use serde_json::Value;

/// Text form of a value for a column of `ty`; `None` binds SQL NULL.
pub fn to_param(ty: &FieldType, v: &Value) -> Option<String> {
    match (ty, v) {
        (_, Value::Null) => None,
        (FieldType::Json | FieldType::Jsonb, other) => Some(other.to_string()),
        (FieldType::Date, Value::Number(n)) => n
            .as_i64()
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
            .map(|d| d.to_rfc3339())
            .or_else(|| Some(n.to_string())),
        (_, Value::String(s)) => Some(s.clone()),
        (_, Value::Bool(b)) => Some(b.to_string()),
        (_, Value::Number(n)) => Some(n.to_string()),
        (_, other) => Some(other.to_string()),
    }
}

/// Type used in `$n::type` casts.
pub fn cast_type(ty: &FieldType) -> String {
    match ty {
        FieldType::String { .. } => "text".into(),
        other => other.pg_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_by_type() {
        assert_eq!(to_param(&FieldType::Integer, &json!(5)), Some("5".into()));
        assert_eq!(to_param(&FieldType::Boolean, &json!(true)), Some("true".into()));
        assert_eq!(to_param(&FieldType::Jsonb, &json!("x")), Some("\"x\"".into()));
        assert_eq!(to_param(&FieldType::Text, &Value::Null), None);
        assert_eq!(
            to_param(&FieldType::Date, &json!(0)),
            Some("1970-01-01T00:00:00+00:00".into())
        );
        assert_eq!(cast_type(&FieldType::String { length: 10 }), "text");
    }
}
