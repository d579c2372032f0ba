//! Workspace database implementations of the feed's data source and
//! read-marker store.

use super::error::SourceError;
use super::item::{
    AssignmentRecord, AttendanceRecord, GlobalRecord, NoticeRecord, SubmissionRecord,
    SubmitterRecord,
};
use super::read_state::KeyValueStore;
use super::source::{FeedSource, SourceResult};
use super::{Identity, Role};
use crate::db;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Timestamp layout used for every stored datetime column, so range filters
/// can compare text directly.
pub const STORED_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";
pub const STORED_DATE: &str = "%Y-%m-%d";

/// Each call runs on the blocking pool with its own connection, so the
/// queries for one feed load overlap.
#[derive(Debug, Clone)]
pub struct SqliteFeedSource {
    db_path: PathBuf,
}

impl SqliteFeedSource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    async fn query<T, F>(&self, f: F) -> SourceResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || -> SourceResult<T> {
            let conn = db::connect(&path)?;
            Ok(f(&conn)?)
        })
        .await?
    }
}

fn global_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<GlobalRecord> {
    Ok(GlobalRecord {
        id: r.get(0)?,
        kind: r.get(1)?,
        message: r.get(2)?,
        date: r.get(3)?,
    })
}

fn assignment_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRecord> {
    Ok(AssignmentRecord {
        id: r.get(0)?,
        title: r.get(1)?,
        due_date: r.get(2)?,
        created_at: r.get(3)?,
        subject_name: r.get(4)?,
    })
}

fn notifications(
    conn: &Connection,
    limit: usize,
    offset: usize,
) -> rusqlite::Result<Vec<GlobalRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, type, message, date
         FROM notifications
         ORDER BY date DESC, id
         LIMIT ? OFFSET ?",
    )?;
    let rows = stmt
        .query_map((limit as i64, offset as i64), global_row)?
        .collect::<rusqlite::Result<Vec<_>>>();
    rows
}

#[async_trait]
impl FeedSource for SqliteFeedSource {
    async fn resolve(&self, identity: &Identity) -> SourceResult<()> {
        let table = match identity.role {
            Role::Admin => return Ok(()),
            Role::Teacher => "teachers",
            Role::Student => "students",
        };
        let user_id = identity.user_id.clone();
        let found = self
            .query(move |conn| {
                conn.query_row(
                    &format!("SELECT 1 FROM {} WHERE id = ?", table),
                    [&user_id],
                    |r| r.get::<_, i64>(0),
                )
                .optional()
            })
            .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(SourceError::NotFound(match identity.role {
                Role::Teacher => "teacher",
                _ => "student",
            })),
        }
    }

    async fn notifications_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>> {
        self.query(move |conn| notifications(conn, limit, offset))
            .await
    }

    async fn recent_notices(&self, limit: usize) -> SourceResult<Vec<NoticeRecord>> {
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, created_at
                 FROM notices
                 ORDER BY created_at DESC, id
                 LIMIT ?",
            )?;
            let rows = stmt
                .query_map([limit as i64], |r| {
                    Ok(NoticeRecord {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        created_at: r.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
        .await
    }

    async fn assignments_for_student(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<AssignmentRecord>> {
        let student_id = student_id.to_string();
        let since = since.format(STORED_TIMESTAMP).to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.title, a.due_date, a.created_at, sub.name
                 FROM assignments a
                 JOIN students s ON s.class_id = a.class_id
                 LEFT JOIN subjects sub ON sub.id = a.subject_id
                 WHERE s.id = ?1
                   AND (a.created_at >= ?2 OR a.due_date >= ?2)
                 ORDER BY COALESCE(a.created_at, a.due_date) DESC, a.id",
            )?;
            let rows = stmt
                .query_map((&student_id, &since), assignment_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
        .await
    }

    async fn assignments_by_teacher(&self, teacher_id: &str) -> SourceResult<Vec<AssignmentRecord>> {
        let teacher_id = teacher_id.to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.title, a.due_date, a.created_at, sub.name
                 FROM assignments a
                 LEFT JOIN subjects sub ON sub.id = a.subject_id
                 WHERE a.teacher_id = ?
                 ORDER BY a.due_date, a.id",
            )?;
            let rows = stmt
                .query_map([&teacher_id], assignment_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
        .await
    }

    async fn submissions_for_assignment(
        &self,
        assignment_id: &str,
    ) -> SourceResult<Vec<SubmissionRecord>> {
        let assignment_id = assignment_id.to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT sm.id, sm.submitted_at, sm.created_at,
                        s.first_name, s.last_name, s.reg_no
                 FROM submissions sm
                 JOIN students s ON s.id = sm.student_id
                 WHERE sm.assignment_id = ?
                 ORDER BY COALESCE(sm.submitted_at, sm.created_at) DESC, sm.id",
            )?;
            let rows = stmt
                .query_map([&assignment_id], |r| {
                    Ok(SubmissionRecord {
                        id: r.get(0)?,
                        submitted_at: r.get(1)?,
                        created_at: r.get(2)?,
                        student: SubmitterRecord {
                            first_name: r.get(3)?,
                            last_name: r.get(4)?,
                            reg_no: r.get(5)?,
                        },
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
        .await
    }

    async fn attendance_for_student(
        &self,
        student_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> SourceResult<Vec<AttendanceRecord>> {
        let student_id = student_id.to_string();
        let from = from.format(STORED_DATE).to_string();
        let to = to.format(STORED_DATE).to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, status, date
                 FROM attendance
                 WHERE student_id = ? AND date >= ? AND date <= ?
                 ORDER BY date DESC",
            )?;
            let rows = stmt
                .query_map((&student_id, &from, &to), |r| {
                    Ok(AttendanceRecord {
                        id: r.get(0)?,
                        status: r.get(1)?,
                        date: r.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
        .await
    }

    async fn global_notifications(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>> {
        self.query(move |conn| notifications(conn, limit, offset))
            .await
    }
}

/// Read markers kept in the workspace's `local_store` table.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: Mutex::new(db::connect(db_path)?),
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        db::local_get(&conn, key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        db::local_set(&conn, key, value)
    }
}
