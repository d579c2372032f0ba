use crate::feed::error::FeedError;
use crate::feed::item::parse_timestamp;
use crate::feed::sqlite::{STORED_DATE, STORED_TIMESTAMP};
use crate::ipc::error::err;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn query(e: impl std::fmt::Display) -> Self {
        Self {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        }
    }

    pub fn insert(table: &str, e: impl std::fmt::Display) -> Self {
        Self {
            code: "db_insert_failed",
            message: e.to_string(),
            details: Some(json!({ "table": table })),
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<FeedError> for HandlerErr {
    fn from(e: FeedError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

/// A trimmed, non-empty string parameter.
pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if s.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(s)
}

/// Absent, `null` and blank all read as `None`.
pub fn get_optional_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be string", key))),
    }
}

/// Parses an optional timestamp parameter into the stored layout.
pub fn get_optional_timestamp(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    let Some(raw) = get_optional_str(params, key)? else {
        return Ok(None);
    };
    parse_timestamp(&raw)
        .map(|dt| Some(dt.format(STORED_TIMESTAMP).to_string()))
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a date or timestamp", key)))
}

/// Like [`get_optional_timestamp`] but defaults to the current time.
pub fn get_timestamp_or_now(params: &Value, key: &str) -> Result<String, HandlerErr> {
    Ok(get_optional_timestamp(params, key)?.unwrap_or_else(now_stamp))
}

pub fn get_required_date(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let raw = get_required_str(params, key)?;
    NaiveDate::parse_from_str(&raw, STORED_DATE)
        .map(|d| d.format(STORED_DATE).to_string())
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn now_stamp() -> String {
    Utc::now().format(STORED_TIMESTAMP).to_string()
}

/// `table` is always a literal from the caller.
pub fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, HandlerErr> {
    conn.query_row(
        &format!("SELECT 1 FROM {} WHERE id = ?", table),
        [id],
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
    .map_err(HandlerErr::query)
}

pub fn require_row(conn: &Connection, table: &str, id: &str, what: &str) -> Result<(), HandlerErr> {
    if row_exists(conn, table, id)? {
        return Ok(());
    }
    Err(HandlerErr {
        code: "not_found",
        message: format!("{} not found", what),
        details: Some(json!({ "id": id })),
    })
}
