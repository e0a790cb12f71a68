//! Null-safe JSON responses.
//!
//! Every payload is converted to a `serde_json::Value` tree and walked once;
//! any non-finite float becomes `null` so NaN never reaches a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Replace NaN and infinite numbers with `null` anywhere in `value`.
/// Idempotent.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Value::Null,
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

/// Serialize and normalize in one step.
pub fn to_json<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value).map(normalize)
}

/// `Json` that goes through [`to_json`] first.
#[derive(Debug, Clone)]
pub struct NullSafeJson<T>(pub T);

impl<T: Serialize> IntoResponse for NullSafeJson<T> {
    fn into_response(self) -> Response {
        match to_json(&self.0) {
            Ok(value) => Json(value).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
