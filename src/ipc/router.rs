use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: [Handler; 9] = [
    handlers::core::try_handle,
    handlers::classes::try_handle,
    handlers::assignments::try_handle,
    handlers::weights::try_handle,
    handlers::grading::try_handle,
    handlers::grades::try_handle,
    handlers::schedule::try_handle,
    handlers::setup::try_handle,
    handlers::backup_exchange::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    for handler in HANDLERS {
        if let Some(resp) = handler(state, &req) {
            return resp;
        }
    }

    tracing::debug!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
