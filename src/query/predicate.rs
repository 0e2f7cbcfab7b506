//! `where` predicates: parsing from JSON params and in-memory evaluation.

use crate::config::FieldDescriptor;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    ILike,
    Is,
    Not,
}

impl CompareOp {
    fn from_key(key: &str) -> Option<CompareOp> {
        Some(match key {
            "$eq" => CompareOp::Eq,
            "$ne" => CompareOp::Ne,
            "$gt" => CompareOp::Gt,
            "$gte" => CompareOp::Gte,
            "$lt" => CompareOp::Lt,
            "$lte" => CompareOp::Lte,
            "$in" => CompareOp::In,
            "$notIn" => CompareOp::NotIn,
            "$like" => CompareOp::Like,
            "$iLike" => CompareOp::ILike,
            "$is" => CompareOp::Is,
            "$not" => CompareOp::Not,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All(Vec::new())
    }
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: Value) -> Predicate {
        let op = if value.is_null() { CompareOp::Is } else { CompareOp::Eq };
        Predicate::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Matches every row.
    pub fn is_trivial(&self) -> bool {
        match self {
            Predicate::All(parts) => parts.iter().all(Predicate::is_trivial),
            _ => false,
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (a, b) if b.is_trivial() => a,
            (a, b) if a.is_trivial() => b,
            (Predicate::All(mut a), Predicate::All(b)) => {
                a.extend(b);
                Predicate::All(a)
            }
            (Predicate::All(mut a), b) => {
                a.push(b);
                Predicate::All(a)
            }
            (a, b) => Predicate::All(vec![a, b]),
        }
    }

    /// Parse a `where` object. Field keys must name model attributes.
    pub fn parse(value: &Value, fields: &[FieldDescriptor]) -> Result<Predicate, String> {
        match value {
            Value::Null => Ok(Predicate::default()),
            Value::Object(map) => parse_object(map, fields),
            _ => Err("must be an object".into()),
        }
    }

    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Predicate::All(parts) => parts.iter().all(|p| p.matches(row)),
            Predicate::Any(parts) => parts.iter().any(|p| p.matches(row)),
            Predicate::Compare { field, op, value } => {
                let actual = row.get(field).unwrap_or(&Value::Null);
                compare(actual, *op, value)
            }
        }
    }
}

fn parse_object(map: &Map<String, Value>, fields: &[FieldDescriptor]) -> Result<Predicate, String> {
    let mut parts = Vec::new();
    for (key, v) in map {
        match key.as_str() {
            "$and" | "$or" => {
                let items = v
                    .as_array()
                    .ok_or_else(|| format!("{} must be an array", key))?;
                let mut inner = Vec::with_capacity(items.len());
                for item in items {
                    inner.push(Predicate::parse(item, fields)?);
                }
                parts.push(if key == "$and" {
                    Predicate::All(inner)
                } else {
                    Predicate::Any(inner)
                });
            }
            k if k.starts_with('$') => return Err(format!("unknown operator '{}'", k)),
            field => {
                if !fields.iter().any(|f| f.name == field) {
                    return Err(format!("unknown field '{}'", field));
                }
                parse_field(field, v, &mut parts)?;
            }
        }
    }
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Predicate::All(parts))
}

fn parse_field(field: &str, v: &Value, parts: &mut Vec<Predicate>) -> Result<(), String> {
    match v {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
            for (key, operand) in ops {
                let op = CompareOp::from_key(key).ok_or_else(|| format!("unknown operator '{}'", key))?;
                match op {
                    CompareOp::In | CompareOp::NotIn if !operand.is_array() => {
                        return Err(format!("{} on '{}' takes an array", key, field));
                    }
                    CompareOp::Like | CompareOp::ILike if !operand.is_string() => {
                        return Err(format!("{} on '{}' takes a string", key, field));
                    }
                    CompareOp::Is | CompareOp::Not if !(operand.is_null() || operand.is_boolean()) => {
                        return Err(format!("{} on '{}' takes null or a boolean", key, field));
                    }
                    _ => {}
                }
                let op = match (op, operand) {
                    (CompareOp::Eq, Value::Null) => CompareOp::Is,
                    (CompareOp::Ne, Value::Null) => CompareOp::Not,
                    (op, _) => op,
                };
                parts.push(Predicate::Compare {
                    field: field.to_string(),
                    op,
                    value: operand.clone(),
                });
            }
        }
        Value::Array(_) => parts.push(Predicate::Compare {
            field: field.to_string(),
            op: CompareOp::In,
            value: v.clone(),
        }),
        _ => parts.push(Predicate::eq(field, v.clone())),
    }
    Ok(())
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !actual.is_null() && !values_equal(actual, expected),
        CompareOp::Gt => matches!(compare_values(actual, expected), Some(Ordering::Greater)),
        CompareOp::Gte => matches!(
            compare_values(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => matches!(compare_values(actual, expected), Some(Ordering::Less)),
        CompareOp::Lte => matches!(
            compare_values(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::In => expected
            .as_array()
            .map(|items| items.iter().any(|e| values_equal(actual, e)))
            .unwrap_or(false),
        CompareOp::NotIn => {
            !actual.is_null()
                && expected
                    .as_array()
                    .map(|items| !items.iter().any(|e| values_equal(actual, e)))
                    .unwrap_or(false)
        }
        CompareOp::Like | CompareOp::ILike => match (actual.as_str(), expected.as_str()) {
            (Some(s), Some(pattern)) => like_regex(pattern, op == CompareOp::ILike)
                .map(|re| re.is_match(s))
                .unwrap_or(false),
            _ => false,
        },
        CompareOp::Is => match expected {
            Value::Null => actual.is_null(),
            other => actual == other,
        },
        CompareOp::Not => match expected {
            Value::Null => !actual.is_null(),
            other => actual != other,
        },
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Equality with numeric coercion (`"5"` equals `5`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_number() || b.is_number() {
        if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
            return x == y;
        }
    }
    a == b
}

/// Ordering for comparable scalars; `None` for mismatched or null operands.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, _) | (_, Value::Null) => None,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

/// Translate a SQL LIKE pattern (`%`, `_`) into an anchored regex.
fn like_regex(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    if case_insensitive {
        re.push_str("(?i)");
    }
    re.push('^');
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn field(name: &str) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            column: name.into(),
            field_type: FieldType::Text,
            allow_null: true,
            default_value: None,
            comment: None,
            primary_key: false,
            auto_increment: false,
            read_only: false,
        }
    }

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn equality_and_null() {
        let fields = [field("email"), field("photo")];
        let p = Predicate::parse(&json!({ "email": "a@b.c", "photo": null }), &fields).unwrap();
        assert!(p.matches(&row(json!({ "email": "a@b.c", "photo": null }))));
        assert!(!p.matches(&row(json!({ "email": "a@b.c", "photo": "x.png" }))));
    }

    #[test]
    fn operators_and_or() {
        let fields = [field("age"), field("name")];
        let p = Predicate::parse(
            &json!({ "$or": [ { "age": { "$gte": 18 } }, { "name": { "$iLike": "j%" } } ] }),
            &fields,
        )
        .unwrap();
        assert!(p.matches(&row(json!({ "age": 30, "name": "x" }))));
        assert!(p.matches(&row(json!({ "age": 3, "name": "John" }))));
        assert!(!p.matches(&row(json!({ "age": 3, "name": "Amy" }))));
    }

    #[test]
    fn array_means_in() {
        let fields = [field("id")];
        let p = Predicate::parse(&json!({ "id": [1, 2] }), &fields).unwrap();
        assert!(p.matches(&row(json!({ "id": "2" }))));
        assert!(!p.matches(&row(json!({ "id": 3 }))));
    }

    #[test]
    fn rejects_unknown_fields_and_operators() {
        let fields = [field("id")];
        assert_eq!(
            Predicate::parse(&json!({ "nope": 1 }), &fields).unwrap_err(),
            "unknown field 'nope'"
        );
        assert_eq!(
            Predicate::parse(&json!({ "id": { "$between": [1, 2] } }), &fields).unwrap_err(),
            "unknown operator '$between'"
        );
        assert!(Predicate::parse(&json!("id = 1"), &fields).is_err());
    }

    #[test]
    fn and_skips_trivial_sides() {
        let p = Predicate::default().and(Predicate::eq("id", json!(1)));
        assert_eq!(p, Predicate::eq("id", json!(1)));
        assert!(Predicate::default().and(Predicate::default()).is_trivial());
    }
}
