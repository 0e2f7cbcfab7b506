//! Params validation against a constraint map.

use crate::error::{AppError, ValidationErrors};
use crate::service::constraints::{Constraint, Constraints};
use serde_json::{Map, Value};

pub struct ParamsValidator;

impl ParamsValidator {
    /// Check every constraint; params without a constraint entry are rejected.
    pub fn validate(params: &Map<String, Value>, constraints: &Constraints) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();
        for key in params.keys() {
            if !constraints.contains_key(key) {
                errors.add(key.as_str(), "is not allowed");
            }
        }
        for (field, constraint) in constraints {
            check(field, params.get(field), constraint, &mut errors);
        }
        errors.into_result()
    }
}

fn check(field: &str, value: Option<&Value>, c: &Constraint, errors: &mut ValidationErrors) {
    let v = match value {
        None => {
            if c.presence {
                errors.add(field, "can't be blank");
            }
            return;
        }
        Some(Value::Null) => {
            if c.presence {
                errors.add(field, "can't be blank");
            } else if c.not_null {
                errors.add(field, "cannot be null");
            }
            return;
        }
        Some(v) => v,
    };

    if let Some(bounds) = &c.number {
        match v.as_f64() {
            None => errors.add(field, "must be a number"),
            Some(n) => {
                if let Some(min) = bounds.min {
                    if n < min {
                        errors.add(field, format!("must be >= {}", min));
                    }
                }
                if let Some(max) = bounds.max {
                    if n > max {
                        errors.add(field, format!("must be <= {}", max));
                    }
                }
            }
        }
    }

    if let Some(allowed) = &c.inclusion {
        let candidates: Vec<&Value> = match v {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        for candidate in candidates {
            let ok = candidate
                .as_str()
                .map(|s| allowed.iter().any(|a| a == s))
                .unwrap_or(false);
            if !ok {
                errors.add(
                    field,
                    format!(
                        "{} is not included in the list",
                        serde_json::to_string(candidate).unwrap_or_default()
                    ),
                );
            }
        }
    }

    if let Some(ty) = &c.native {
        if let Err(message) = ty.validate(v) {
            errors.add(field, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn list_constraints() -> Constraints {
        let mut c = Constraints::new();
        c.insert("offset".into(), Constraint::number(Some(0.0), Some(9_007_199_254_740_991.0)));
        c.insert("limit".into(), Constraint::number(Some(0.0), Some(1000.0)));
        c.insert("scope".into(), Constraint::inclusion(vec!["withDeleted".into()]));
        c
    }

    fn errors_of(r: Result<(), AppError>) -> ValidationErrors {
        match r {
            Err(AppError::Validation(e)) => e,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn number_bounds() {
        let c = list_constraints();
        assert!(ParamsValidator::validate(&params(json!({ "limit": 1000, "offset": 0 })), &c).is_ok());
        let e = errors_of(ParamsValidator::validate(&params(json!({ "limit": 1001 })), &c));
        assert_eq!(e.get("limit"), Some(&["must be <= 1000".to_string()][..]));
        let e = errors_of(ParamsValidator::validate(&params(json!({ "offset": -1 })), &c));
        assert_eq!(e.get("offset"), Some(&["must be >= 0".to_string()][..]));
        let e = errors_of(ParamsValidator::validate(&params(json!({ "limit": "ten" })), &c));
        assert_eq!(e.get("limit"), Some(&["must be a number".to_string()][..]));
        assert!(ParamsValidator::validate(&params(json!({ "limit": 2.5, "offset": 0.5 })), &c).is_ok());
        let e = errors_of(ParamsValidator::validate(&params(json!({ "offset": 1e300 })), &c));
        assert_eq!(e.get("offset"), Some(&["must be <= 9007199254740991".to_string()][..]));
    }

    #[test]
    fn null_scope_is_allowed() {
        let c = list_constraints();
        assert!(ParamsValidator::validate(&params(json!({ "scope": null })), &c).is_ok());
        let e = errors_of(ParamsValidator::validate(&params(json!({ "scope": "all" })), &c));
        assert_eq!(e.get("scope"), Some(&["\"all\" is not included in the list".to_string()][..]));
    }

    #[test]
    fn presence_and_unknown_params() {
        let mut c = Constraints::new();
        c.insert("id".into(), Constraint::presence());
        let e = errors_of(ParamsValidator::validate(&params(json!({ "name": "x" })), &c));
        assert_eq!(e.get("id"), Some(&["can't be blank".to_string()][..]));
        assert_eq!(e.get("name"), Some(&["is not allowed".to_string()][..]));
    }

    #[test]
    fn native_check_only_when_present() {
        let mut c = Constraints::new();
        c.insert(
            "age".into(),
            Constraint {
                native: Some(FieldType::Integer),
                ..Default::default()
            },
        );
        assert!(ParamsValidator::validate(&Map::new(), &c).is_ok());
        let e = errors_of(ParamsValidator::validate(&params(json!({ "age": "old" })), &c));
        assert_eq!(e.get("age"), Some(&["\"old\" is not a valid integer".to_string()][..]));
    }

    #[test]
    fn not_null_fields_reject_explicit_null() {
        let mut c = Constraints::new();
        c.insert(
            "email".into(),
            Constraint {
                not_null: true,
                ..Default::default()
            },
        );
        let e = errors_of(ParamsValidator::validate(&params(json!({ "email": null })), &c));
        assert_eq!(e.get("email"), Some(&["cannot be null".to_string()][..]));
    }
}
