use crate::ipc::error::{no_workspace, ok};
use crate::ipc::helpers::{get_required_date, get_required_str, require_row, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

const STATUSES: &[&str] = &["present", "absent", "late", "excused"];

/// One mark per student and day; marking again replaces the status.
fn attendance_mark(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_date(params, "date")?;
    let status = get_required_str(params, "status")?.to_ascii_lowercase();
    if !STATUSES.contains(&status.as_str()) {
        return Err(HandlerErr::bad_params(format!(
            "status must be one of: {}",
            STATUSES.join(", ")
        )));
    }
    require_row(conn, "students", &student_id, "student")?;

    conn.execute(
        "INSERT INTO attendance(id, student_id, date, status)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(student_id, date) DO UPDATE SET
           status = excluded.status",
        (Uuid::new_v4().to_string(), &student_id, &date, &status),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "attendance" })),
    })?;

    let attendance_id: String = conn
        .query_row(
            "SELECT id FROM attendance WHERE student_id = ? AND date = ?",
            (&student_id, &date),
            |r| r.get(0),
        )
        .map_err(HandlerErr::query)?;

    Ok(json!({ "attendanceId": attendance_id, "status": status }))
}

fn handle_attendance_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    match attendance_mark(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_attendance_mark(state, req)),
        _ => None,
    }
}
