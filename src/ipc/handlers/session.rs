use crate::feed::{Identity, Role};
use crate::ipc::error::{no_workspace, ok};
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn identify(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let role_raw = get_required_str(params, "role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| HandlerErr::bad_params("role must be one of: admin, teacher, student"))?;
    let user_id = get_required_str(params, "userId")?;
    let Some(feed) = state.feed.as_ref() else {
        return Err(HandlerErr {
            code: "no_workspace",
            message: "select a workspace first".into(),
            details: None,
        });
    };

    let read_count = feed.identify(Identity::new(role, user_id.clone()));
    Ok(json!({
        "role": role,
        "userId": user_id,
        "readCount": read_count,
    }))
}

fn handle_session_identify(state: &mut AppState, req: &Request) -> serde_json::Value {
    match identify(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_session_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(feed) = state.feed.as_ref() else {
        return no_workspace(&req.id);
    };
    feed.clear_identity();
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.identify" => Some(handle_session_identify(state, req)),
        "session.clear" => Some(handle_session_clear(state, req)),
        _ => None,
    }
}
