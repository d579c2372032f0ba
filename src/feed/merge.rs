use super::config::FetchLimits;
use super::item::{
    parse_timestamp, AssignmentAudience, AssignmentRecord, NotificationItem, SourceRecord,
};
use super::source::{FeedSource, SourceResult};
use super::{Identity, Role};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use std::future::Future;

/// Runs one source call, trading a failure for an empty result so a single
/// unavailable source never sinks the whole feed.
async fn or_empty<T, F>(source: &'static str, fut: F) -> Vec<T>
where
    F: Future<Output = SourceResult<Vec<T>>>,
{
    match fut.await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(source, error = %e, "feed source failed; substituting empty result");
            Vec::new()
        }
    }
}

/// Newest first. Undated items go last; equal dates keep their input order.
pub fn sort_newest_first(items: &mut [NotificationItem]) {
    items.sort_by(|a, b| b.date.cmp(&a.date));
}

/// One page of the admin notifications source.
pub async fn admin_page(
    source: &dyn FeedSource,
    limit: usize,
    offset: usize,
) -> Vec<NotificationItem> {
    or_empty("notifications", source.notifications_page(limit, offset))
        .await
        .into_iter()
        .map(|r| SourceRecord::Global(r).into_item())
        .collect()
}

/// Fetches and merges every source for the viewer's role, sorted newest
/// first. Admins get the first `admin_page_size` notifications.
pub async fn collect_role_items(
    source: &dyn FeedSource,
    identity: &Identity,
    limits: &FetchLimits,
    now: DateTime<Utc>,
) -> Vec<NotificationItem> {
    let records = match identity.role {
        Role::Admin => return admin_page(source, limits.admin_page_size, 0).await,
        Role::Teacher => teacher_records(source, &identity.user_id, limits, now).await,
        Role::Student => student_records(source, &identity.user_id, limits, now).await,
    };

    let mut items: Vec<NotificationItem> =
        records.into_iter().map(SourceRecord::into_item).collect();
    sort_newest_first(&mut items);
    items
}

async fn teacher_records(
    source: &dyn FeedSource,
    teacher_id: &str,
    limits: &FetchLimits,
    now: DateTime<Utc>,
) -> Vec<SourceRecord> {
    let (notices, assignments, globals) = tokio::join!(
        or_empty("notices", source.recent_notices(limits.notice_limit)),
        or_empty("teacher_assignments", source.assignments_by_teacher(teacher_id)),
        or_empty(
            "global_notifications",
            source.global_notifications(limits.global_limit, 0)
        ),
    );

    let due: Vec<AssignmentRecord> = assignments
        .into_iter()
        .filter(|a| due_within(a, now, limits.teacher_due_window_days))
        .collect();

    let submissions = join_all(due.iter().map(|assignment| async move {
        let rows = or_empty(
            "submissions",
            source.submissions_for_assignment(&assignment.id),
        )
        .await;
        (assignment.title.clone(), rows)
    }))
    .await;

    let mut records: Vec<SourceRecord> = notices.into_iter().map(SourceRecord::Notice).collect();
    records.extend(due.into_iter().map(|assignment| SourceRecord::Assignment {
        assignment,
        audience: AssignmentAudience::Teacher,
    }));
    for (assignment_title, rows) in submissions {
        records.extend(rows.into_iter().map(|submission| SourceRecord::Submission {
            submission,
            assignment_title: assignment_title.clone(),
        }));
    }
    records.extend(globals.into_iter().map(SourceRecord::Global));
    records
}

async fn student_records(
    source: &dyn FeedSource,
    student_id: &str,
    limits: &FetchLimits,
    now: DateTime<Utc>,
) -> Vec<SourceRecord> {
    let since = now - Duration::days(limits.assignment_window_days);
    let attendance_from = (now - Duration::days(limits.attendance_window_days)).date_naive();
    let today = now.date_naive();

    let (notices, assignments, attendance, globals) = tokio::join!(
        or_empty("notices", source.recent_notices(limits.notice_limit)),
        or_empty(
            "student_assignments",
            source.assignments_for_student(student_id, since)
        ),
        or_empty(
            "attendance",
            source.attendance_for_student(student_id, attendance_from, today)
        ),
        or_empty(
            "global_notifications",
            source.global_notifications(limits.global_limit, 0)
        ),
    );

    let mut records: Vec<SourceRecord> = notices.into_iter().map(SourceRecord::Notice).collect();
    records.extend(assignments.into_iter().map(|assignment| SourceRecord::Assignment {
        assignment,
        audience: AssignmentAudience::Student,
    }));
    records.extend(attendance.into_iter().map(SourceRecord::Attendance));
    records.extend(globals.into_iter().map(SourceRecord::Global));
    records
}

/// Due date within `days` of `now` on either side: recently past deadlines
/// still collect submissions.
fn due_within(assignment: &AssignmentRecord, now: DateTime<Utc>, days: i64) -> bool {
    let Some(due) = assignment.due_date.as_deref().and_then(parse_timestamp) else {
        return false;
    };
    let window = Duration::days(days);
    due >= now - window && due <= now + window
}
