use crate::db;
use crate::feed::config::FeedConfig;
use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Feed,
    Badge,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "feed" => Some(Self::Feed),
            "badge" => Some(Self::Badge),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Feed => "setup.feed",
            Self::Badge => "setup.badge",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    let defaults = FeedConfig::default();
    match section {
        SetupSection::Feed => json!({
            "pageSize": defaults.feed.page_size,
            "noticeLimit": defaults.feed.notice_limit,
            "globalLimit": defaults.feed.global_limit,
            "assignmentWindowDays": defaults.feed.assignment_window_days,
            "attendanceWindowDays": defaults.feed.attendance_window_days,
            "teacherDueWindowDays": defaults.feed.teacher_due_window_days
        }),
        SetupSection::Badge => json!({
            "intervalSeconds": defaults.badge.interval_seconds,
            "noticeLimit": defaults.badge.notice_limit,
            "globalLimit": defaults.badge.global_limit,
            "adminPageSize": defaults.badge.admin_page_size,
            "assignmentWindowDays": defaults.badge.assignment_window_days,
            "attendanceWindowDays": defaults.badge.attendance_window_days,
            "teacherDueWindowDays": defaults.badge.teacher_due_window_days
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        let n = match (section, k.as_str()) {
            (_, "noticeLimit" | "globalLimit") => parse_i64_range(v, k, 0, 200)?,
            (_, "assignmentWindowDays" | "attendanceWindowDays") => {
                parse_i64_range(v, k, 1, 365)?
            }
            (_, "teacherDueWindowDays") => parse_i64_range(v, k, 0, 90)?,
            (SetupSection::Feed, "pageSize") | (SetupSection::Badge, "adminPageSize") => {
                parse_i64_range(v, k, 1, 100)?
            }
            (SetupSection::Badge, "intervalSeconds") => parse_i64_range(v, k, 5, 3600)?,
            (SetupSection::Feed, _) => return Err(format!("unknown feed field: {}", k)),
            (SetupSection::Badge, _) => return Err(format!("unknown badge field: {}", k)),
        };
        obj.insert(k.clone(), Value::from(n));
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Applied field by field so one stale value keeps its default only.
            for (k, v) in saved_obj {
                let mut single = Map::new();
                single.insert(k.clone(), v.clone());
                if let Err(e) = merge_section_patch(section, &mut current, &single) {
                    tracing::warn!(key = section.key(), error = %e, "ignoring saved setting");
                }
            }
        }
    }
    Ok(current)
}

/// Reads both persisted sections into the live feed configuration.
pub fn load_feed_config(conn: &rusqlite::Connection) -> anyhow::Result<FeedConfig> {
    let feed = load_section(conn, SetupSection::Feed)?;
    let badge = load_section(conn, SetupSection::Badge)?;
    Ok(serde_json::from_value(json!({ "feed": feed, "badge": badge }))?)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let feed = match load_section(conn, SetupSection::Feed) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let badge = match load_section(conn, SetupSection::Badge) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(&req.id, json!({ "feed": feed, "badge": badge }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    let config = match load_feed_config(conn) {
        Ok(config) => config,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    if let Some(feed) = state.feed.clone() {
        let restart = feed.config().badge_interval() != config.badge_interval();
        feed.set_config(config);
        if restart {
            state.restart_badge_refresher();
        }
    }
    ok(&req.id, json!({ "ok": true, "section": section_raw, "value": current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
