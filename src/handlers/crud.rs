//! Action dispatch and model-introspection handlers.

use crate::error::AppError;
use crate::extractors::RoleHeader;
use crate::response::{success_action, success_one_ok};
use crate::state::CrudState;
use crate::store::ModelStore;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Map, Value};

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

/// An empty body is no params; anything else must be a JSON object sent as JSON.
fn body_to_params(headers: &HeaderMap, body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    if !is_json_content_type(headers) {
        return Err(AppError::BadRequest("expected Content-Type: application/json".into()));
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("params must be a JSON object".into())),
    }
}

/// POST /:action with the params as the JSON body.
pub async fn call_action<S: ModelStore + 'static>(
    State(state): State<CrudState<S>>,
    Path(action): Path<String>,
    role: RoleHeader,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let params = body_to_params(&headers, &body)?;
    let ctx = role.into_context();
    let output = state.controller.call_action(&ctx, &action, params).await?;
    Ok(success_action(output, &action))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsQuery {
    #[serde(default)]
    pub exclude_read_only: bool,
}

/// GET /fields?excludeReadOnly=true
pub async fn model_fields<S: ModelStore + 'static>(
    State(state): State<CrudState<S>>,
    role: RoleHeader,
    Query(query): Query<FieldsQuery>,
) -> impl IntoResponse {
    let ctx = role.into_context();
    success_one_ok(state.controller.get_model_fields(&ctx, query.exclude_read_only))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        h
    }

    fn kind(r: Result<Map<String, Value>, AppError>) -> &'static str {
        match r {
            Err(e) => e.kind(),
            Ok(_) => "OK",
        }
    }

    #[test]
    fn empty_body_is_no_params() {
        assert!(body_to_params(&HeaderMap::new(), b"").unwrap().is_empty());
        assert!(body_to_params(&json_headers(), b"  \n").unwrap().is_empty());
        assert!(body_to_params(&json_headers(), b"null").unwrap().is_empty());
    }

    #[test]
    fn malformed_or_untyped_bodies_are_rejected() {
        assert_eq!(kind(body_to_params(&json_headers(), br#"{"displayName": "John","#)), "BAD_REQUEST");
        assert_eq!(kind(body_to_params(&HeaderMap::new(), br#"{"displayName": "John"}"#)), "BAD_REQUEST");
        assert_eq!(kind(body_to_params(&json_headers(), b"[1, 2]")), "BAD_REQUEST");
        let params = body_to_params(&json_headers(), br#"{"limit": 5}"#).unwrap();
        assert_eq!(params.get("limit"), Some(&Value::from(5)));
    }
}
