mod test_support;

use serde_json::json;
use test_support::{seed_school, temp_dir, Sidecar};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schoolhub-router-smoke");
    let mut sidecar = Sidecar::spawn();

    let health = sidecar.request_ok("health", json!({}));
    assert!(health["workspacePath"].is_null());

    for method in ["feed.load", "session.identify", "setup.get", "notices.create"] {
        let params = json!({ "role": "admin", "userId": "root", "title": "x" });
        assert_eq!(sidecar.request_err(method, params), "no_workspace", "{}", method);
    }

    sidecar.request_ok(
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let health = sidecar.request_ok("health", json!({}));
    assert!(health["workspacePath"].is_string());
    assert!(health["viewer"].is_null());

    let school = seed_school(&mut sidecar);
    let classes = sidecar.request_ok("classes.list", json!({}));
    assert_eq!(classes["classes"][0]["studentCount"], 1);

    let assignment = sidecar.request_ok(
        "assignments.create",
        json!({
            "classId": school.class_id,
            "teacherId": school.teacher_id,
            "title": "Essay",
            "subject": "English",
            "dueDate": test_support::date_days_from_now(2)
        }),
    );
    sidecar.request_ok(
        "submissions.create",
        json!({
            "assignmentId": assignment["assignmentId"],
            "studentId": school.student_id
        }),
    );
    sidecar.request_ok(
        "attendance.mark",
        json!({
            "studentId": school.student_id,
            "date": test_support::date_days_from_now(0),
            "status": "Absent"
        }),
    );
    sidecar.request_ok("notices.create", json!({ "title": "Sports day" }));
    sidecar.request_ok(
        "notifications.broadcast",
        json!({ "type": "fee", "message": "Fees due Friday" }),
    );

    assert_eq!(sidecar.request_err("feed.get", json!({})), "no_identity");
    sidecar.request_ok(
        "session.identify",
        json!({ "role": "student", "userId": school.student_id }),
    );
    for method in [
        "feed.load",
        "feed.loadMore",
        "feed.get",
        "feed.markAllRead",
        "feed.markAllUnread",
        "feed.badge",
        "feed.refreshBadge",
    ] {
        sidecar.request_ok(method, json!({}));
    }
    sidecar.request_ok("feed.toggle", json!({ "id": "notice_missing" }));
    sidecar.request_ok("setup.get", json!({}));
    sidecar.request_ok("session.clear", json!({}));

    let unknown = sidecar.request("nope.method", json!({}));
    assert_eq!(test_support::error_code(&unknown), "not_implemented");
}

#[test]
fn malformed_lines_get_bad_json_and_the_loop_continues() {
    let mut sidecar = Sidecar::spawn();
    sidecar.send_raw("{not json");
    let reply = sidecar.read_line();
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "bad_json");

    sidecar.request_ok("health", json!({}));
}

#[test]
fn record_inserts_validate_params() {
    let workspace = temp_dir("schoolhub-record-validation");
    let mut sidecar = Sidecar::open(workspace.path());
    let school = seed_school(&mut sidecar);

    assert_eq!(
        sidecar.request_err("classes.create", json!({ "name": "  " })),
        "bad_params"
    );
    assert_eq!(
        sidecar.request_err(
            "students.create",
            json!({ "classId": "missing", "firstName": "A", "lastName": "B" })
        ),
        "not_found"
    );
    assert_eq!(
        sidecar.request_err(
            "attendance.mark",
            json!({ "studentId": school.student_id, "date": "2026-05-01", "status": "asleep" })
        ),
        "bad_params"
    );
    assert_eq!(
        sidecar.request_err(
            "attendance.mark",
            json!({ "studentId": school.student_id, "date": "May 1st", "status": "late" })
        ),
        "bad_params"
    );
    assert_eq!(
        sidecar.request_err(
            "notices.create",
            json!({ "title": "Trip", "createdAt": "someday" })
        ),
        "bad_params"
    );
    assert_eq!(
        sidecar.request_err(
            "session.identify",
            json!({ "role": "parent", "userId": "p1" })
        ),
        "bad_params"
    );

    // Marking the same day again replaces the status.
    let first = sidecar.request_ok(
        "attendance.mark",
        json!({ "studentId": school.student_id, "date": "2026-05-01", "status": "late" }),
    );
    let second = sidecar.request_ok(
        "attendance.mark",
        json!({ "studentId": school.student_id, "date": "2026-05-01", "status": "excused" }),
    );
    assert_eq!(first["attendanceId"], second["attendanceId"]);
    assert_eq!(second["status"], "excused");

    let broadcast = sidecar.request_ok(
        "notifications.broadcast",
        json!({ "type": "Parking", "message": "Lot closed" }),
    );
    assert_eq!(broadcast["type"], "admin");
}

#[test]
fn broadcast_labels_are_stored_as_given() {
    let workspace = temp_dir("schoolhub-broadcast-label");
    let mut sidecar = Sidecar::open(workspace.path());
    let created = sidecar.request_ok(
        "notifications.broadcast",
        json!({ "type": "Fee", "message": "Fees due Friday" }),
    );
    assert_eq!(created["type"], "fee");

    let conn = rusqlite::Connection::open(workspace.path().join("schoolhub.sqlite3"))
        .expect("open workspace db");
    let stored: String = conn
        .query_row(
            "SELECT type FROM notifications WHERE id = ?",
            [created["notificationId"].as_str().expect("notificationId")],
            |r| r.get(0),
        )
        .expect("stored row");
    assert_eq!(stored, "Fee");

    sidecar.request_ok("session.identify", json!({ "role": "admin", "userId": "root" }));
    let page = sidecar.request_ok("feed.load", json!({}));
    assert_eq!(page["items"][0]["type"], "fee");
}
