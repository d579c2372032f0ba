use super::error::SourceError;
use super::item::{AssignmentRecord, AttendanceRecord, GlobalRecord, NoticeRecord, SubmissionRecord};
use super::Identity;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Data the feed is assembled from. Every call is independent so callers are
/// free to issue them concurrently.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Confirms the viewer exists in the backing data.
    async fn resolve(&self, identity: &Identity) -> SourceResult<()>;

    /// Administrator notifications, newest first.
    async fn notifications_page(&self, limit: usize, offset: usize)
        -> SourceResult<Vec<GlobalRecord>>;

    async fn recent_notices(&self, limit: usize) -> SourceResult<Vec<NoticeRecord>>;

    /// Assignments for the student's class created or due on/after `since`.
    async fn assignments_for_student(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<AssignmentRecord>>;

    async fn assignments_by_teacher(&self, teacher_id: &str) -> SourceResult<Vec<AssignmentRecord>>;

    async fn submissions_for_assignment(
        &self,
        assignment_id: &str,
    ) -> SourceResult<Vec<SubmissionRecord>>;

    /// Attendance entries with `from <= date <= to`.
    async fn attendance_for_student(
        &self,
        student_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> SourceResult<Vec<AttendanceRecord>>;

    /// Broadcast notifications shown to every role.
    async fn global_notifications(
        &self,
        limit: usize,
        offset: usize,
    ) -> SourceResult<Vec<GlobalRecord>>;
}
