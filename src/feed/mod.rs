//! Unified notification feed: merges notices, assignments, submissions,
//! attendance and broadcast notifications for the current viewer, pages
//! through them and tracks which items the viewer has read.

mod aggregator;
pub mod badge;
pub mod config;
pub mod error;
pub mod item;
mod merge;
pub mod read_state;
pub mod source;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use aggregator::{BadgeUpdate, FeedEntry, FeedView, NotificationFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "teacher" => Some(Self::Teacher),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

/// The viewer a feed is being built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub role: Role,
    pub user_id: String,
}

impl Identity {
    pub fn new(role: Role, user_id: impl Into<String>) -> Self {
        Self {
            role,
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role.as_str(), self.user_id)
    }
}
