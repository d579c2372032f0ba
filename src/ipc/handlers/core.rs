use crate::db;
use crate::feed::sqlite::{SqliteFeedSource, SqliteKeyValueStore};
use crate::feed::NotificationFeed;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::load_feed_config;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let viewer = state.feed.as_ref().and_then(|f| f.identity());
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "viewer": viewer.map(|v| json!({ "role": v.role, "userId": v.user_id })),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    // A damaged settings row must not keep the workspace closed.
    let config = load_feed_config(&conn).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "feed settings unreadable; using defaults");
        Default::default()
    });

    let db_file = db::db_path(&path);
    let store = match SqliteKeyValueStore::open(&db_file) {
        Ok(store) => store,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let feed = Arc::new(NotificationFeed::new(
        Arc::new(SqliteFeedSource::new(db_file)),
        Arc::new(store),
        config,
    ));
    // The viewer survives a workspace switch; their read markers come from
    // the new workspace.
    if let Some(viewer) = state.feed.as_ref().and_then(|f| f.identity()) {
        feed.identify(viewer);
    }

    tracing::info!(workspace = %path.display(), "workspace selected");
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.feed = Some(feed);
    state.restart_badge_refresher();

    ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
