use crate::attendance::MonthKey;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::Request;
use serde::de::DeserializeOwned;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_u64(params: &serde_json::Value, key: &str) -> Result<u64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Deserializes `params[key]` into `T`.
pub fn get_typed<T: DeserializeOwned>(params: &serde_json::Value, key: &str) -> Result<T, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(v.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

/// Accepts `{ year, month }` or `{ month: "YYYY-MM" }`.
pub fn parse_month_params(params: &serde_json::Value) -> Result<MonthKey, HandlerErr> {
    if let Some(raw) = params.get("month").and_then(|v| v.as_str()) {
        return Ok(MonthKey::parse(raw)?);
    }
    let year = params
        .get("year")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing year"))?;
    let month = get_required_u64(params, "month")?;
    let year = i32::try_from(year).map_err(|_| HandlerErr::bad_params("year out of range"))?;
    let month = u32::try_from(month).map_err(|_| HandlerErr::bad_params("month out of range"))?;
    Ok(MonthKey::new(year, month)?)
}

/// Wraps a handler result in the response envelope, logging failures.
pub fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => {
            tracing::warn!(method = %req.method, id = %req.id, code = error.code, "{}", error.message);
            error.response(&req.id)
        }
    }
}
