use databyte_api_types::{PageResult, Pagination, Record};
use serde_json::Value;

use super::transport::NetworkError;

/// Turn either accepted response shape into a [`PageResult`].
///
/// A bare array is a complete single-page collection. An object must carry a
/// `data` array; its `pagination` is used when present and synthesized otherwise.
pub fn normalize(payload: Value) -> Result<PageResult, NetworkError> {
    match payload {
        Value::Array(items) => Ok(PageResult::single_page(records(items)?)),
        Value::Object(mut envelope) => {
            let data = match envelope.remove("data") {
                Some(Value::Array(items)) => records(items)?,
                Some(_) => return Err(shape("`data` must be an array")),
                None => return Err(shape("object payload has no `data` field")),
            };
            let pagination = match envelope.remove("pagination") {
                Some(Value::Null) | None => Pagination::single_page(data.len()),
                Some(raw) => serde_json::from_value(raw)
                    .map_err(|err| shape(format!("invalid pagination: {err}")))?,
            };
            Ok(PageResult { data, pagination })
        }
        other => Err(shape(format!(
            "expected an array or an envelope, got {}",
            kind(&other)
        ))),
    }
}

fn records(items: Vec<Value>) -> Result<Vec<Record>, NetworkError> {
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|err| shape(format!("invalid record: {err}")))
        })
        .collect()
}

fn shape(message: impl Into<String>) -> NetworkError {
    NetworkError::UnexpectedShape(message.into())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
