//! Typed errors, structured error envelopes and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: model {model} field {field}")]
    InvalidPrimaryKey { model: String, field: String },
    #[error("duplicate field: {0}")]
    DuplicateField(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("unknown type '{type_name}' for field {field}")]
    UnknownType { field: String, type_name: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Per-field validation messages, ordered by field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when no messages were collected.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for m in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{} {}", field, m)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("validation: {0}")]
    Validation(ValidationErrors),
    #[error("{message}")]
    ObjectNotFound { message: String, detail: Value },
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence: {0}")]
    Persistence(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            AppError::UnknownAction(_) => "UNKNOWN_ACTION",
            AppError::Db(_) => "DATABASE_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    pub fn structured(&self) -> StructuredError {
        let detail = match self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            AppError::ObjectNotFound { detail, .. } => Some(detail.clone()),
            _ => None,
        };
        let message = match self {
            AppError::ObjectNotFound { message, .. } => message.clone(),
            other => other.to_string(),
        };
        error_formatter(self.kind(), message, detail)
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ObjectNotFound { .. } | AppError::UnknownAction(_) => StatusCode::NOT_FOUND,
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
                sqlx::Error::Database(db) if db.is_unique_violation() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Error shape handed back to callers of an action.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructuredError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

pub fn error_formatter(kind: &str, message: impl Into<String>, detail: Option<Value>) -> StructuredError {
    StructuredError {
        kind: kind.to_string(),
        message: message.into(),
        detail,
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }
        let structured = self.structured();
        let body = ErrorBody {
            error: ErrorDetail {
                code: structured.kind,
                message: structured.message,
                details: structured.detail,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_not_found_keeps_detail() {
        let err = AppError::ObjectNotFound {
            message: "users not found.".into(),
            detail: json!({ "where": { "id": 7 } }),
        };
        let s = err.structured();
        assert_eq!(s.kind, "OBJECT_NOT_FOUND");
        assert_eq!(s.message, "users not found.");
        assert_eq!(s.detail, Some(json!({ "where": { "id": 7 } })));
    }

    #[test]
    fn validation_detail_is_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("limit", "must be <= 1000");
        errors.add("id", "can't be blank");
        let s = AppError::Validation(errors).structured();
        assert_eq!(s.kind, "VALIDATION_ERROR");
        assert_eq!(
            s.detail,
            Some(json!({ "id": ["can't be blank"], "limit": ["must be <= 1000"] }))
        );
    }

    #[test]
    fn empty_errors_pass() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
