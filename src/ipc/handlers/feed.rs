use crate::feed::badge::badge_event;
use crate::feed::error::FeedError;
use crate::feed::{FeedView, NotificationFeed};
use crate::ipc::error::{no_workspace, ok};
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

const METHODS: &[&str] = &[
    "feed.load",
    "feed.loadMore",
    "feed.get",
    "feed.toggle",
    "feed.markAllRead",
    "feed.markAllUnread",
    "feed.badge",
    "feed.refreshBadge",
];

fn view_json(view: Result<FeedView, FeedError>) -> Result<Value, HandlerErr> {
    let view = view?;
    serde_json::to_value(view).map_err(|e| HandlerErr {
        code: "serialize_failed",
        message: e.to_string(),
        details: None,
    })
}

fn parse_page_size(params: &Value) -> Result<Option<usize>, HandlerErr> {
    match params.get("pageSize") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) if (1..=100).contains(&n) => Ok(Some(n as usize)),
            _ => Err(HandlerErr::bad_params("pageSize must be in 1..=100")),
        },
    }
}

fn require_viewer(feed: &NotificationFeed) -> Result<(), HandlerErr> {
    match feed.identity() {
        Some(_) => Ok(()),
        None => Err(FeedError::NoIdentity.into()),
    }
}

fn badge(feed: &NotificationFeed) -> Result<Value, HandlerErr> {
    let viewer = feed.identity().ok_or(FeedError::NoIdentity)?;
    Ok(json!({
        "role": viewer.role,
        "userId": viewer.user_id,
        "unread": feed.badge(),
        "loadedUnread": feed.unread_count(),
    }))
}

async fn refresh_badge(state: &AppState, feed: &NotificationFeed) -> Result<Value, HandlerErr> {
    require_viewer(feed)?;
    let Some(update) = feed.refresh_badge().await else {
        return Ok(json!({ "unread": feed.badge(), "changed": false, "refreshed": false }));
    };
    if update.changed {
        let _ = state.events.send(badge_event(&update));
    }
    Ok(json!({
        "unread": update.unread,
        "changed": update.changed,
        "refreshed": true,
    }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    if !METHODS.contains(&req.method.as_str()) {
        return None;
    }
    let Some(feed) = state.feed.clone() else {
        return Some(no_workspace(&req.id));
    };

    let result = match req.method.as_str() {
        "feed.load" => match parse_page_size(&req.params) {
            Ok(page_size) => view_json(feed.load(page_size).await),
            Err(e) => Err(e),
        },
        "feed.loadMore" => view_json(feed.load_more().await),
        "feed.get" => view_json(feed.snapshot()),
        "feed.toggle" => match get_required_str(&req.params, "id") {
            Ok(id) => view_json(feed.toggle_one(&id)),
            Err(e) => Err(e),
        },
        "feed.markAllRead" => view_json(feed.mark_all_read()),
        "feed.markAllUnread" => view_json(feed.mark_all_unread()),
        "feed.badge" => badge(&feed),
        _ => refresh_badge(state, &feed).await,
    };

    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    })
}
