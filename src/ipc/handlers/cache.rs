use crate::cache::{cache_key, ListMutation};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, get_required_u64, respond};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn key_from_params(params: &serde_json::Value) -> Result<String, HandlerErr> {
    if let Some(key) = get_optional_str(params, "key") {
        return Ok(key);
    }
    let query = get_required_str(params, "query")?;
    let filters = params.get("filters").cloned().unwrap_or(serde_json::Value::Null);
    if !(filters.is_null() || filters.is_object()) {
        return Err(HandlerErr::bad_params("filters must be an object"));
    }
    Ok(cache_key(&query, &filters))
}

fn cache_begin(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = key_from_params(params)?;
    let generation = state.cache.begin(&key);
    Ok(json!({ "key": key, "generation": generation }))
}

fn cache_resolve(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = key_from_params(params)?;
    let generation = get_required_u64(params, "generation")?;
    let data = params
        .get("data")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing data"))?;
    let applied = state.cache.resolve(&key, generation, data);
    if !applied {
        tracing::debug!(key = %key, generation, "stale response ignored");
    }
    Ok(json!({ "key": key, "applied": applied }))
}

fn cache_get(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = key_from_params(params)?;
    let entry = state.cache.get(&key);
    Ok(json!({
        "key": key,
        "data": entry.and_then(|e| e.data.clone()),
        "inFlight": entry.map(|e| e.in_flight.is_some()).unwrap_or(false),
    }))
}

fn cache_cancel(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = key_from_params(params)?;
    let cancelled = state.cache.cancel(&key);
    Ok(json!({ "key": key, "cancelled": cancelled }))
}

fn cache_invalidate(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let query = get_optional_str(params, "query");
    let removed = state.cache.invalidate(query.as_deref());
    Ok(json!({ "removed": removed }))
}

fn cache_mutate(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = key_from_params(params)?;
    let list_field = get_optional_str(params, "listField");
    let mutation: ListMutation = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid mutation: {}", e)))?;
    match state.cache.mutate(&key, list_field.as_deref(), mutation)? {
        Some(outcome) => Ok(json!({
            "key": key,
            "applied": true,
            "mutationId": outcome.mutation_id,
            "data": outcome.data,
        })),
        None => Ok(json!({ "key": key, "applied": false })),
    }
}

fn cache_rollback(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mutation_id = get_required_str(params, "mutationId")?;
    let restored = state.cache.rollback(&mutation_id);
    Ok(json!({ "restored": restored }))
}

fn cache_settle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mutation_id = get_required_str(params, "mutationId")?;
    let settled = state.cache.settle(&mutation_id);
    Ok(json!({ "settled": settled }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "cache.begin" => cache_begin(state, &req.params),
        "cache.resolve" => cache_resolve(state, &req.params),
        "cache.get" => cache_get(state, &req.params),
        "cache.cancel" => cache_cancel(state, &req.params),
        "cache.invalidate" => cache_invalidate(state, &req.params),
        "cache.mutate" => cache_mutate(state, &req.params),
        "cache.rollback" => cache_rollback(state, &req.params),
        "cache.settle" => cache_settle(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
