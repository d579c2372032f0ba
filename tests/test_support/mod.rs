#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub fn temp_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp dir")
}

/// A running daemon. Pushed event lines seen while waiting for a response
/// are kept in `events`.
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
    pub events: Vec<Value>,
}

impl Sidecar {
    pub fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_schoolhubd");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn schoolhubd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
            events: Vec::new(),
        }
    }

    /// Spawns a daemon with `workspace` already selected.
    pub fn open(workspace: &Path) -> Self {
        let mut sidecar = Self::spawn();
        sidecar.request_ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        sidecar
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub fn read_line(&mut self) -> Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "daemon closed stdout");
        serde_json::from_str(line.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        self.send_raw(&payload.to_string());

        loop {
            let value = self.read_line();
            if value.get("event").is_some() {
                self.events.push(value);
                continue;
            }
            assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
            if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
                assert_ne!(
                    error_code(&value),
                    "not_implemented",
                    "unexpected unknown method for {}",
                    method
                );
            }
            return value;
        }
    }

    pub fn request_ok(&mut self, method: &str, params: Value) -> Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(Value::Null)
    }

    pub fn request_err(&mut self, method: &str, params: Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        error_code(&value).to_string()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn error_code(value: &Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

/// Ids of the items in a feed view, in display order.
pub fn item_ids(view: &Value) -> Vec<String> {
    view["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_str().expect("item id").to_string())
        .collect()
}

/// `YYYY-MM-DD HH:MM:SS`, `days` from now (negative for the past).
pub fn stamp_days_from_now(days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(days))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn date_days_from_now(days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

pub struct School {
    pub class_id: String,
    pub teacher_id: String,
    pub student_id: String,
}

/// One class with one teacher and one student (Ngozi Okafor, R-1).
pub fn seed_school(sidecar: &mut Sidecar) -> School {
    let class = sidecar.request_ok("classes.create", json!({ "name": "9A" }));
    let class_id = class["classId"].as_str().expect("classId").to_string();
    let teacher = sidecar.request_ok(
        "teachers.create",
        json!({ "firstName": "Ada", "lastName": "Mensah" }),
    );
    let student = sidecar.request_ok(
        "students.create",
        json!({
            "classId": class_id,
            "firstName": "Ngozi",
            "lastName": "Okafor",
            "regNo": "R-1"
        }),
    );
    School {
        class_id,
        teacher_id: teacher["teacherId"].as_str().expect("teacherId").to_string(),
        student_id: student["studentId"].as_str().expect("studentId").to_string(),
    }
}
