use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::feed::badge::spawn_badge_refresher;
use crate::feed::NotificationFeed;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub feed: Option<Arc<NotificationFeed>>,
    /// Outgoing event lines, interleaved with responses by the stdout writer.
    pub events: UnboundedSender<String>,
    badge_task: Option<JoinHandle<()>>,
}

impl AppState {
    pub fn new(events: UnboundedSender<String>) -> Self {
        Self {
            workspace: None,
            db: None,
            feed: None,
            events,
            badge_task: None,
        }
    }

    /// Replaces the running badge refresher with one for the current feed,
    /// using the feed's configured interval.
    pub fn restart_badge_refresher(&mut self) {
        self.stop_badge_refresher();
        let Some(feed) = self.feed.clone() else {
            return;
        };
        let every = feed.config().badge_interval();
        self.badge_task = Some(spawn_badge_refresher(feed, self.events.clone(), every));
    }

    pub fn stop_badge_refresher(&mut self) {
        if let Some(task) = self.badge_task.take() {
            task.abort();
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.stop_badge_refresher();
    }
}
