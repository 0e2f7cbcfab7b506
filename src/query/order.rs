//! `order` params: `"name"`, `"-name"`, `["name", "DESC"]`, or a list of those.

use crate::config::FieldDescriptor;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn parse(s: &str) -> Option<Direction> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderBy {
            field: field.into(),
            direction: Direction::Asc,
        }
    }
}

pub fn parse_order(value: &Value, fields: &[FieldDescriptor]) -> Result<Vec<OrderBy>, String> {
    let terms = match value {
        Value::Null => return Ok(Vec::new()),
        Value::String(s) => vec![parse_term_str(s)?],
        Value::Array(items) => {
            if let Some(pair) = as_pair(items) {
                vec![pair]
            } else {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(match item {
                        Value::String(s) => parse_term_str(s)?,
                        Value::Array(inner) => {
                            as_pair(inner).ok_or_else(|| "expected [field, direction]".to_string())?
                        }
                        _ => return Err("must be a string or [field, direction]".into()),
                    });
                }
                out
            }
        }
        _ => return Err("must be a string or an array".into()),
    };
    for t in &terms {
        if !fields.iter().any(|f| f.name == t.field) {
            return Err(format!("unknown field '{}'", t.field));
        }
    }
    Ok(terms)
}

fn as_pair(items: &[Value]) -> Option<OrderBy> {
    match items {
        [Value::String(field), Value::String(dir)] => Direction::parse(dir).map(|direction| OrderBy {
            field: field.clone(),
            direction,
        }),
        _ => None,
    }
}

fn parse_term_str(s: &str) -> Result<OrderBy, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty order term".into());
    }
    if let Some(field) = s.strip_prefix('-') {
        return Ok(OrderBy {
            field: field.to_string(),
            direction: Direction::Desc,
        });
    }
    let mut parts = s.split_whitespace();
    let field = parts.next().unwrap_or_default().to_string();
    let direction = match parts.next() {
        Some(d) => Direction::parse(d).ok_or_else(|| format!("invalid direction '{}'", d))?,
        None => Direction::Asc,
    };
    Ok(OrderBy { field, direction })
}
