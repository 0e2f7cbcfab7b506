//! Semantic field types and their native value validators.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    String { length: u32 },
    Text,
    Boolean,
    Date,
    DateOnly,
    Uuid,
    Enum { values: Vec<String> },
    Json,
    Jsonb,
}

const DEFAULT_STRING_LENGTH: u32 = 255;

impl FieldType {
    /// Parse a config type name. Accepts `STRING(64)` as well as a separate `length`.
    pub fn parse(type_name: &str, length: Option<u32>, values: &[String]) -> Option<FieldType> {
        let trimmed = type_name.trim();
        let (base, inline_len) = match trimmed.find('(') {
            Some(open) if trimmed.ends_with(')') => {
                let inner = &trimmed[open + 1..trimmed.len() - 1];
                (&trimmed[..open], inner.trim().parse::<u32>().ok())
            }
            _ => (trimmed, None),
        };
        let ty = match base.trim().to_uppercase().as_str() {
            "INTEGER" | "INT" => FieldType::Integer,
            "BIGINT" => FieldType::BigInt,
            "FLOAT" => FieldType::Float,
            "DOUBLE" => FieldType::Double,
            "DECIMAL" | "NUMERIC" => FieldType::Decimal,
            "STRING" | "VARCHAR" => FieldType::String {
                length: length.or(inline_len).unwrap_or(DEFAULT_STRING_LENGTH),
            },
            "TEXT" => FieldType::Text,
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            "DATE" => FieldType::Date,
            "DATEONLY" => FieldType::DateOnly,
            "UUID" => FieldType::Uuid,
            "ENUM" => FieldType::Enum {
                values: values.to_vec(),
            },
            "JSON" => FieldType::Json,
            "JSONB" => FieldType::Jsonb,
            _ => return None,
        };
        Some(ty)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::BigInt => "BIGINT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Decimal => "DECIMAL",
            FieldType::String { .. } => "STRING",
            FieldType::Text => "TEXT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Date => "DATE",
            FieldType::DateOnly => "DATEONLY",
            FieldType::Uuid => "UUID",
            FieldType::Enum { .. } => "ENUM",
            FieldType::Json => "JSON",
            FieldType::Jsonb => "JSONB",
        }
    }

    /// PostgreSQL type used for DDL and for parameter casts.
    pub fn pg_type(&self) -> String {
        match self {
            FieldType::Integer => "integer".into(),
            FieldType::BigInt => "bigint".into(),
            FieldType::Float | FieldType::Double => "double precision".into(),
            FieldType::Decimal => "numeric".into(),
            FieldType::String { length } => format!("varchar({})", length),
            FieldType::Text | FieldType::Enum { .. } => "text".into(),
            FieldType::Boolean => "boolean".into(),
            FieldType::Date => "timestamptz".into(),
            FieldType::DateOnly => "date".into(),
            FieldType::Uuid => "uuid".into(),
            FieldType::Json => "json".into(),
            FieldType::Jsonb => "jsonb".into(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::BigInt)
    }

    /// JSON types carry no native validator.
    pub fn has_validator(&self) -> bool {
        !matches!(self, FieldType::Json | FieldType::Jsonb)
    }

    /// Run the native validator. The error is the message to surface verbatim.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let ok = match self {
            FieldType::Integer | FieldType::BigInt => is_integer_value(value),
            FieldType::Float | FieldType::Double | FieldType::Decimal => is_numeric_value(value),
            FieldType::String { .. } | FieldType::Text => value.is_string() || value.is_number(),
            FieldType::Boolean => is_boolean_value(value),
            FieldType::Date => is_date_value(value),
            FieldType::DateOnly => value
                .as_str()
                .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .unwrap_or(false),
            FieldType::Uuid => value
                .as_str()
                .map(|s| uuid::Uuid::parse_str(s).is_ok())
                .unwrap_or(false),
            FieldType::Enum { values } => value
                .as_str()
                .map(|s| values.iter().any(|v| v == s))
                .unwrap_or(false),
            FieldType::Json | FieldType::Jsonb => true,
        };
        if ok {
            return Ok(());
        }
        let shown = serde_json::to_string(value).unwrap_or_default();
        Err(match self {
            FieldType::Enum { values } => format!(
                "{} is not a valid choice in {}",
                shown,
                serde_json::to_string(values).unwrap_or_default()
            ),
            other => format!("{} is not a valid {}", shown, other.message_noun()),
        })
    }

    fn message_noun(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::BigInt => "bigint",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Decimal => "decimal",
            FieldType::String { .. } | FieldType::Text => "string",
            FieldType::Boolean => "boolean",
            FieldType::Date | FieldType::DateOnly => "date",
            FieldType::Uuid => "uuid",
            FieldType::Enum { .. } => "choice",
            FieldType::Json | FieldType::Jsonb => "json",
        }
    }
}

fn is_integer_value(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_numeric_value(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false),
        _ => false,
    }
}

fn is_boolean_value(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        Value::String(s) => matches!(s.as_str(), "true" | "false" | "0" | "1"),
        _ => false,
    }
}

fn is_date_value(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => parse_date(s).is_some(),
        _ => false,
    }
}

/// Parse the date shapes accepted by DATE fields.
pub fn parse_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
    if let Ok(d) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&d));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| Utc.from_utc_datetime(&d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_inline_length() {
        assert_eq!(
            FieldType::parse("string(64)", None, &[]),
            Some(FieldType::String { length: 64 })
        );
        assert_eq!(
            FieldType::parse("STRING", None, &[]),
            Some(FieldType::String { length: 255 })
        );
        assert_eq!(FieldType::parse("GEOMETRY", None, &[]), None);
    }

    #[test]
    fn integer_messages_are_verbatim() {
        let ty = FieldType::Integer;
        assert!(ty.validate(&json!(3)).is_ok());
        assert!(ty.validate(&json!("42")).is_ok());
        assert_eq!(ty.validate(&json!("abc")).unwrap_err(), "\"abc\" is not a valid integer");
        assert_eq!(ty.validate(&json!(1.5)).unwrap_err(), "1.5 is not a valid integer");
    }

    #[test]
    fn enum_lists_choices() {
        let ty = FieldType::Enum {
            values: vec!["WEBAPP_ADMIN".into(), "CONSUMER".into()],
        };
        assert!(ty.validate(&json!("CONSUMER")).is_ok());
        assert_eq!(
            ty.validate(&json!("ROOT")).unwrap_err(),
            "\"ROOT\" is not a valid choice in [\"WEBAPP_ADMIN\",\"CONSUMER\"]"
        );
    }

    #[test]
    fn dates_and_booleans() {
        assert!(FieldType::Date.validate(&json!("2017-03-11T10:00:00Z")).is_ok());
        assert!(FieldType::Date.validate(&json!("2017-03-11")).is_ok());
        assert!(FieldType::Date.validate(&json!("yesterday")).is_err());
        assert!(FieldType::DateOnly.validate(&json!("2017-03-11")).is_ok());
        assert!(FieldType::Boolean.validate(&json!("1")).is_ok());
        assert!(FieldType::Boolean.validate(&json!("yes")).is_err());
    }

    #[test]
    fn json_has_no_validator() {
        assert!(!FieldType::Jsonb.has_validator());
        assert!(FieldType::Jsonb.validate(&json!({"any": ["thing"]})).is_ok());
    }
}
