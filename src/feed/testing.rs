//! In-memory feed source for unit tests.

use super::error::SourceError;
use super::item::{
    AssignmentRecord, AttendanceRecord, GlobalRecord, NoticeRecord, SubmissionRecord,
    SubmitterRecord,
};
use super::source::{FeedSource, SourceResult};
use super::Identity;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;

pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("test timestamp")
        .with_timezone(&Utc)
}

#[derive(Default)]
pub struct StaticSource {
    notices: Vec<NoticeRecord>,
    student_assignments: Vec<AssignmentRecord>,
    teacher_assignments: Vec<AssignmentRecord>,
    submissions: HashMap<String, Vec<SubmissionRecord>>,
    attendance: Vec<AttendanceRecord>,
    globals: Vec<GlobalRecord>,
    admin: Mutex<Vec<GlobalRecord>>,
    failing: HashSet<&'static str>,
    unknown_users: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn with_notice(mut self, id: &str, created_at: &str) -> Self {
        self.notices.push(NoticeRecord {
            id: id.into(),
            title: format!("Notice {id}"),
            created_at: Some(created_at.into()),
        });
        self
    }

    pub fn with_student_assignment(mut self, id: &str, created_at: &str) -> Self {
        self.student_assignments.push(AssignmentRecord {
            id: id.into(),
            title: format!("Assignment {id}"),
            due_date: None,
            created_at: Some(created_at.into()),
            subject_name: Some("Maths".into()),
        });
        self
    }

    pub fn with_teacher_assignment(mut self, record: AssignmentRecord) -> Self {
        self.teacher_assignments.push(record);
        self
    }

    pub fn with_submission(mut self, assignment_id: &str, id: &str, submitted_at: &str) -> Self {
        self.submissions
            .entry(assignment_id.to_string())
            .or_default()
            .push(SubmissionRecord {
                id: id.into(),
                submitted_at: Some(submitted_at.into()),
                created_at: None,
                student: SubmitterRecord {
                    first_name: "Sam".into(),
                    last_name: "Reed".into(),
                    reg_no: None,
                },
            });
        self
    }

    pub fn with_attendance(mut self, id: &str, status: &str, date: &str) -> Self {
        self.attendance.push(AttendanceRecord {
            id: id.into(),
            status: status.into(),
            date: Some(date.into()),
        });
        self
    }

    pub fn with_global(mut self, id: &str, date: &str) -> Self {
        self.globals.push(GlobalRecord {
            id: id.into(),
            kind: "admin".into(),
            message: format!("Broadcast {id}"),
            date: Some(date.into()),
        });
        self
    }

    /// Adds `count` global notifications one minute apart, newest first.
    pub fn with_globals(mut self, count: usize) -> Self {
        for i in 0..count {
            self.globals.push(GlobalRecord {
                id: format!("g{i}"),
                kind: "admin".into(),
                message: format!("Broadcast {i}"),
                date: Some(format!("2026-05-19 10:{:02}:00", 59 - i)),
            });
        }
        self
    }

    pub fn with_admin_notifications(self, count: usize) -> Self {
        self.push_admin_notifications(count);
        self
    }

    pub fn push_admin_notifications(&self, count: usize) {
        let mut admin = self.admin.lock().unwrap();
        let start = admin.len();
        for i in start..start + count {
            admin.push(GlobalRecord {
                id: format!("adm{i}"),
                kind: "admin".into(),
                message: format!("Admin notice {i}"),
                date: Some("2026-05-19 10:00:00".into()),
            });
        }
    }

    pub fn failing(mut self, source: &'static str) -> Self {
        self.failing.insert(source);
        self
    }

    pub fn unknown_user(mut self, user_id: &str) -> Self {
        self.unknown_users.insert(user_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, source: &'static str, call: String) -> SourceResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(source) {
            return Err(SourceError::Unavailable(source.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn resolve(&self, identity: &Identity) -> SourceResult<()> {
        if self.unknown_users.contains(&identity.user_id) {
            return Err(SourceError::NotFound("user"));
        }
        Ok(())
    }

    async fn notifications_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>> {
        self.record("notifications", format!("notifications_page({limit}, {offset})"))?;
        Ok(self
            .admin
            .lock()
            .unwrap()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent_notices(&self, limit: usize) -> SourceResult<Vec<NoticeRecord>> {
        self.record("notices", format!("recent_notices({limit})"))?;
        Ok(self.notices.iter().take(limit).cloned().collect())
    }

    async fn assignments_for_student(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<AssignmentRecord>> {
        self.record(
            "student_assignments",
            format!(
                "assignments_for_student({student_id}, {})",
                since.format("%Y-%m-%d")
            ),
        )?;
        Ok(self.student_assignments.clone())
    }

    async fn assignments_by_teacher(&self, teacher_id: &str) -> SourceResult<Vec<AssignmentRecord>> {
        self.record(
            "teacher_assignments",
            format!("assignments_by_teacher({teacher_id})"),
        )?;
        Ok(self.teacher_assignments.clone())
    }

    async fn submissions_for_assignment(
        &self,
        assignment_id: &str,
    ) -> SourceResult<Vec<SubmissionRecord>> {
        self.record(
            "submissions",
            format!("submissions_for_assignment({assignment_id})"),
        )?;
        Ok(self
            .submissions
            .get(assignment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn attendance_for_student(
        &self,
        student_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> SourceResult<Vec<AttendanceRecord>> {
        self.record(
            "attendance",
            format!("attendance_for_student({student_id}, {from}..{to})"),
        )?;
        Ok(self.attendance.clone())
    }

    async fn global_notifications(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>> {
        self.record(
            "global_notifications",
            format!("global_notifications({limit}, {offset})"),
        )?;
        Ok(self.globals.iter().skip(offset).take(limit).cloned().collect())
    }
}

/// Holds admin page requests until `gate` is notified, so tests can change
/// the viewer while a load is in flight.
pub struct GatedSource {
    inner: StaticSource,
    pub entered: Notify,
    pub gate: Notify,
}

impl GatedSource {
    pub fn new(inner: StaticSource) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }
}

#[async_trait]
impl FeedSource for GatedSource {
    async fn resolve(&self, identity: &Identity) -> SourceResult<()> {
        self.inner.resolve(identity).await
    }

    async fn notifications_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.notifications_page(limit, offset).await
    }

    async fn recent_notices(&self, limit: usize) -> SourceResult<Vec<NoticeRecord>> {
        self.inner.recent_notices(limit).await
    }

    async fn assignments_for_student(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<AssignmentRecord>> {
        self.inner.assignments_for_student(student_id, since).await
    }

    async fn assignments_by_teacher(&self, teacher_id: &str) -> SourceResult<Vec<AssignmentRecord>> {
        self.inner.assignments_by_teacher(teacher_id).await
    }

    async fn submissions_for_assignment(
        &self,
        assignment_id: &str,
    ) -> SourceResult<Vec<SubmissionRecord>> {
        self.inner.submissions_for_assignment(assignment_id).await
    }

    async fn attendance_for_student(
        &self,
        student_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> SourceResult<Vec<AttendanceRecord>> {
        self.inner.attendance_for_student(student_id, from, to).await
    }

    async fn global_notifications(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>> {
        self.inner.global_notifications(limit, offset).await
    }
}
