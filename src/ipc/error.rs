//! Line envelopes written to stdout: replies carry the request `id`, pushed
//! events carry an `event` name instead.

use serde_json::{json, Value};

pub fn ok(id: &str, result: Value) -> Value {
    json!({ "id": id, "ok": true, "result": result })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    let mut error = json!({ "code": code, "message": message.into() });
    if let Some(details) = details {
        error["details"] = details;
    }
    json!({ "id": id, "ok": false, "error": error })
}

/// Reply for any workspace-bound method called before `workspace.select`.
pub fn no_workspace(id: &str) -> Value {
    err(id, "no_workspace", "select a workspace first", None)
}

/// An unsolicited line; hosts tell it apart from replies by the missing `id`.
pub fn event(name: &str, data: Value) -> String {
    json!({ "event": name, "data": data }).to_string()
}
