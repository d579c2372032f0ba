//! Periodic unread-badge refresh, independent of the foreground feed.

use super::{BadgeUpdate, NotificationFeed};
use crate::ipc::error::event;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub const BADGE_EVENT: &str = "feed.badge";

/// The event line pushed to the host when the badge moves.
pub fn badge_event(update: &BadgeUpdate) -> String {
    event(
        BADGE_EVENT,
        json!({
            "role": update.identity.role,
            "userId": update.identity.user_id,
            "unread": update.unread,
        }),
    )
}

/// Spawns the refresher. Each tick recounts unread items for the current
/// viewer and pushes a `feed.badge` event line when the count changed. Runs
/// until aborted or the event channel closes.
pub fn spawn_badge_refresher(
    feed: Arc<NotificationFeed>,
    events: UnboundedSender<String>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = every.as_secs(), "starting badge refresher");

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first refresh
        // lands one interval after start.
        timer.tick().await;

        loop {
            timer.tick().await;

            let Some(update) = feed.refresh_badge().await else {
                continue;
            };
            if !update.changed {
                continue;
            }

            if events.send(badge_event(&update)).is_err() {
                tracing::debug!("event channel closed; stopping badge refresher");
                break;
            }
        }
    })
}
