//! Task request body extraction
//!
//! Accepts JSON objects or `application/x-www-form-urlencoded` forms and
//! coerces the loosely-typed fields into a [`TaskDraft`].

use std::collections::HashMap;

use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use taskhub_db::TaskDraft;
use tracing::debug;

use crate::response::ApiError;

const INVALID_BODY: &str = "Invalid request body";

/// Task fields taken from the request body
#[derive(Debug)]
pub struct TaskBody(pub TaskDraft);

impl<S> FromRequest<S> for TaskBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let fields = if is_form {
            let Form(pairs) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| {
                    debug!("Rejected form body: {}", e);
                    ApiError::BadRequest(INVALID_BODY.to_string())
                })?;
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect()
        } else {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|_| ApiError::BadRequest(INVALID_BODY.to_string()))?;
            json_fields(&bytes)?
        };

        Ok(TaskBody(draft_from_fields(&fields)))
    }
}

/// Decode a JSON object body; an empty body has no fields.
fn json_fields(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            debug!("Rejected non-object JSON body");
            Err(ApiError::BadRequest(INVALID_BODY.to_string()))
        }
    }
}

/// Build a draft from decoded body fields
pub fn draft_from_fields(fields: &Map<String, Value>) -> TaskDraft {
    TaskDraft {
        name: scalar_string(fields.get("name")),
        description: scalar_string(fields.get("description")),
        deadline: scalar_string(fields.get("deadline")),
        completed: truthy(fields.get("completed")),
        assigned_user: scalar_string(fields.get("assignedUser")),
    }
}

/// Stringify a scalar; empty strings, null and containers are absent
fn scalar_string(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true" || s == "1",
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}
