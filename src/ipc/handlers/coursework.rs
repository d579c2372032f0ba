use crate::ipc::error::{no_workspace, ok};
use crate::ipc::helpers::{
    get_optional_str, get_optional_timestamp, get_required_str, get_timestamp_or_now, now_stamp,
    require_row, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

/// Subjects are created on first mention.
fn subject_id_for(conn: &Connection, name: &str) -> Result<String, HandlerErr> {
    conn.execute(
        "INSERT INTO subjects(id, name) VALUES(?, ?) ON CONFLICT(name) DO NOTHING",
        (Uuid::new_v4().to_string(), name),
    )
    .map_err(|e| HandlerErr::insert("subjects", e))?;
    conn.query_row("SELECT id FROM subjects WHERE name = ?", [name], |r| r.get(0))
        .map_err(HandlerErr::query)
}

fn assignments_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let teacher_id = get_required_str(params, "teacherId")?;
    let title = get_required_str(params, "title")?;
    let due_date = get_optional_timestamp(params, "dueDate")?;
    let created_at = get_timestamp_or_now(params, "createdAt")?;
    let subject = get_optional_str(params, "subject")?;
    require_row(conn, "classes", &class_id, "class")?;
    require_row(conn, "teachers", &teacher_id, "teacher")?;

    let subject_id = match subject.as_deref() {
        Some(name) => Some(subject_id_for(conn, name)?),
        None => None,
    };

    let assignment_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO assignments(id, class_id, teacher_id, subject_id, title, due_date, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &assignment_id,
            &class_id,
            &teacher_id,
            &subject_id,
            &title,
            &due_date,
            &created_at,
        ),
    )
    .map_err(|e| HandlerErr::insert("assignments", e))?;

    Ok(json!({ "assignmentId": assignment_id }))
}

fn submissions_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let student_id = get_required_str(params, "studentId")?;
    let submitted_at = get_optional_timestamp(params, "submittedAt")?;
    require_row(conn, "assignments", &assignment_id, "assignment")?;
    require_row(conn, "students", &student_id, "student")?;

    let submission_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO submissions(id, assignment_id, student_id, submitted_at, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            &submission_id,
            &assignment_id,
            &student_id,
            &submitted_at,
            now_stamp(),
        ),
    )
    .map_err(|e| HandlerErr::insert("submissions", e))?;

    Ok(json!({ "submissionId": submission_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "assignments.create" => assignments_create,
            "submissions.create" => submissions_create,
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
