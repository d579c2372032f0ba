use crate::feed::item::NotificationKind;
use crate::ipc::error::{no_workspace, ok};
use crate::ipc::helpers::{get_optional_str, get_required_str, get_timestamp_or_now, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn notices_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let title = get_required_str(params, "title")?;
    let body = get_optional_str(params, "body")?;
    let created_at = get_timestamp_or_now(params, "createdAt")?;

    let notice_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notices(id, title, body, created_at) VALUES(?, ?, ?, ?)",
        (&notice_id, &title, &body, &created_at),
    )
    .map_err(|e| HandlerErr::insert("notices", e))?;

    Ok(json!({ "noticeId": notice_id, "createdAt": created_at }))
}

fn notifications_broadcast(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let label = get_required_str(params, "type")?;
    let message = get_required_str(params, "message")?;
    let date = get_timestamp_or_now(params, "date")?;

    let notification_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notifications(id, type, message, date) VALUES(?, ?, ?, ?)",
        (&notification_id, &label, &message, &date),
    )
    .map_err(|e| HandlerErr::insert("notifications", e))?;

    // Unknown labels are stored as given and shown as admin broadcasts.
    Ok(json!({
        "notificationId": notification_id,
        "type": NotificationKind::from_label(&label),
        "date": date,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "notices.create" => notices_create,
            "notifications.broadcast" => notifications_broadcast,
            _ => return None,
        };
    let Some(conn) = state.db.as_ref() else {
        return Some(no_workspace(&req.id));
    };
    Some(match op(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
