use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which pass a merge is running for. The badge pass is a cheap first page
/// used only to count unread items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Full,
    Badge,
}

/// Per-source bounds for one merge pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub notice_limit: usize,
    pub global_limit: usize,
    /// Admin page size when the pass is not driven by the pagination cursor.
    pub admin_page_size: usize,
    pub assignment_window_days: i64,
    pub attendance_window_days: i64,
    pub teacher_due_window_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSection {
    pub page_size: usize,
    pub notice_limit: usize,
    pub global_limit: usize,
    pub assignment_window_days: i64,
    pub attendance_window_days: i64,
    pub teacher_due_window_days: i64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            page_size: 10,
            notice_limit: 20,
            global_limit: 20,
            assignment_window_days: 30,
            attendance_window_days: 30,
            teacher_due_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BadgeSection {
    pub interval_seconds: u64,
    pub notice_limit: usize,
    pub global_limit: usize,
    pub admin_page_size: usize,
    pub assignment_window_days: i64,
    pub attendance_window_days: i64,
    pub teacher_due_window_days: i64,
}

impl Default for BadgeSection {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            notice_limit: 5,
            global_limit: 5,
            admin_page_size: 5,
            assignment_window_days: 7,
            attendance_window_days: 7,
            teacher_due_window_days: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    pub feed: FeedSection,
    pub badge: BadgeSection,
}

impl FeedConfig {
    pub fn limits(&self, mode: FetchMode) -> FetchLimits {
        match mode {
            FetchMode::Full => self.full_limits(),
            FetchMode::Badge => self.badge_limits(),
        }
    }

    pub fn full_limits(&self) -> FetchLimits {
        FetchLimits {
            notice_limit: self.feed.notice_limit,
            global_limit: self.feed.global_limit,
            admin_page_size: self.feed.page_size,
            assignment_window_days: self.feed.assignment_window_days,
            attendance_window_days: self.feed.attendance_window_days,
            teacher_due_window_days: self.feed.teacher_due_window_days,
        }
    }

    pub fn badge_limits(&self) -> FetchLimits {
        FetchLimits {
            notice_limit: self.badge.notice_limit,
            global_limit: self.badge.global_limit,
            admin_page_size: self.badge.admin_page_size,
            assignment_window_days: self.badge.assignment_window_days,
            attendance_window_days: self.badge.attendance_window_days,
            teacher_due_window_days: self.badge.teacher_due_window_days,
        }
    }

    pub fn badge_interval(&self) -> Duration {
        Duration::from_secs(self.badge.interval_seconds.max(1))
    }
}
