use crate::debounce::Debouncer;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, get_required_u64, respond};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn search_input(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let search_id = get_required_str(params, "searchId")?;
    let text = get_required_str(params, "text")?;
    let now_ms = get_required_u64(params, "nowMs")?;
    let delay = state.config.search.debounce_ms;
    let due_at = state
        .searches
        .entry(search_id)
        .or_insert_with(|| Debouncer::new(delay))
        .input(text, now_ms);
    Ok(json!({ "dueAtMs": due_at }))
}

fn search_poll(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let search_id = get_required_str(params, "searchId")?;
    let now_ms = get_required_u64(params, "nowMs")?;
    let Some(debouncer) = state.searches.get_mut(&search_id) else {
        return Ok(json!({ "fire": false }));
    };
    match debouncer.poll(now_ms) {
        Some(text) => Ok(json!({ "fire": true, "text": text })),
        None => Ok(json!({ "fire": false, "dueAtMs": debouncer.due_at() })),
    }
}

fn search_close(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let search_id = get_required_str(params, "searchId")?;
    let closed = state.searches.remove(&search_id).is_some();
    Ok(json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "search.input" => search_input(state, &req.params),
        "search.poll" => search_poll(state, &req.params),
        "search.close" => search_close(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
