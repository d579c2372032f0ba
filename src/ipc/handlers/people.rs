use crate::ipc::error::{no_workspace, ok};
use crate::ipc::helpers::{get_optional_str, get_required_str, now_stamp, require_row, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let first_name = get_required_str(params, "firstName")?;
    let last_name = get_required_str(params, "lastName")?;
    let reg_no = get_optional_str(params, "regNo")?;
    require_row(conn, "classes", &class_id, "class")?;

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, class_id, last_name, first_name, reg_no, active, created_at)
         VALUES(?, ?, ?, ?, ?, 1, ?)",
        (
            &student_id,
            &class_id,
            &last_name,
            &first_name,
            &reg_no,
            now_stamp(),
        ),
    )
    .map_err(|e| HandlerErr::insert("students", e))?;

    Ok(json!({ "studentId": student_id }))
}

fn teachers_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let first_name = get_required_str(params, "firstName")?;
    let last_name = get_required_str(params, "lastName")?;

    let teacher_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO teachers(id, last_name, first_name, created_at) VALUES(?, ?, ?, ?)",
        (&teacher_id, &last_name, &first_name, now_stamp()),
    )
    .map_err(|e| HandlerErr::insert("teachers", e))?;

    Ok(json!({ "teacherId": teacher_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "students.create" => students_create,
            "teachers.create" => teachers_create,
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
