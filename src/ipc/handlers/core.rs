use crate::ipc::helpers::respond;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        req,
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "debounceMs": state.config.search.debounce_ms,
            "openDrafts": state.drafts.len(),
        })),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        _ => None,
    }
}
