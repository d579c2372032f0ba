use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Notice,
    Assignment,
    Submission,
    Attendance,
    Student,
    Teacher,
    Class,
    Fee,
    Department,
    Admin,
}

impl NotificationKind {
    /// Broadcast rows carry a free-form type label; anything unrecognised is
    /// shown with admin styling.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "notice" => Self::Notice,
            "assignment" => Self::Assignment,
            "submission" => Self::Submission,
            "attendance" => Self::Attendance,
            "student" => Self::Student,
            "teacher" => Self::Teacher,
            "class" => Self::Class,
            "fee" => Self::Fee,
            "department" => Self::Department,
            _ => Self::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeRecord {
    pub id: String,
    pub title: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    pub id: String,
    pub title: String,
    pub due_date: Option<String>,
    pub created_at: Option<String>,
    pub subject_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterRecord {
    pub first_name: String,
    pub last_name: String,
    pub reg_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub id: String,
    pub submitted_at: Option<String>,
    pub created_at: Option<String>,
    pub student: SubmitterRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub id: String,
    pub status: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalRecord {
    pub id: String,
    pub kind: String,
    pub message: String,
    pub date: Option<String>,
}

/// Who the assignment is being announced to. Students see new work, teachers
/// see upcoming deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAudience {
    Student,
    Teacher,
}

#[derive(Debug, Clone)]
pub enum SourceRecord {
    Notice(NoticeRecord),
    Assignment {
        assignment: AssignmentRecord,
        audience: AssignmentAudience,
    },
    Submission {
        submission: SubmissionRecord,
        assignment_title: String,
    },
    Attendance(AttendanceRecord),
    Global(GlobalRecord),
}

impl SourceRecord {
    pub fn into_item(self) -> NotificationItem {
        match self {
            Self::Notice(notice) => notice_item(notice),
            Self::Assignment {
                assignment,
                audience,
            } => assignment_item(assignment, audience),
            Self::Submission {
                submission,
                assignment_title,
            } => submission_item(submission, &assignment_title),
            Self::Attendance(record) => attendance_item(record),
            Self::Global(record) => global_item(record),
        }
    }
}

fn notice_item(notice: NoticeRecord) -> NotificationItem {
    NotificationItem {
        id: format!("notice_{}", notice.id),
        kind: NotificationKind::Notice,
        message: format!("New notice: {}", notice.title),
        date: notice.created_at.as_deref().and_then(parse_timestamp),
    }
}

fn assignment_item(assignment: AssignmentRecord, audience: AssignmentAudience) -> NotificationItem {
    let due = assignment.due_date.as_deref().and_then(parse_timestamp);
    let due_label = due
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "no due date".to_string());

    let (message, date) = match audience {
        AssignmentAudience::Student => {
            let message = match assignment.subject_name.as_deref() {
                Some(subject) if !subject.trim().is_empty() => format!(
                    "New assignment in {}: {} (due {})",
                    subject, assignment.title, due_label
                ),
                _ => format!("New assignment: {} (due {})", assignment.title, due_label),
            };
            let created = assignment.created_at.as_deref().and_then(parse_timestamp);
            (message, created.or(due))
        }
        AssignmentAudience::Teacher => (
            format!("Assignment \"{}\" is due {}", assignment.title, due_label),
            due,
        ),
    };

    NotificationItem {
        id: format!("assign_{}", assignment.id),
        kind: NotificationKind::Assignment,
        message,
        date,
    }
}

fn submission_item(submission: SubmissionRecord, assignment_title: &str) -> NotificationItem {
    let who = format!(
        "{} {}",
        submission.student.first_name.trim(),
        submission.student.last_name.trim()
    );
    let who = match submission.student.reg_no.as_deref() {
        Some(reg) if !reg.trim().is_empty() => format!("{} ({})", who.trim(), reg.trim()),
        _ => who.trim().to_string(),
    };
    let date = submission
        .submitted_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| submission.created_at.as_deref().and_then(parse_timestamp));

    NotificationItem {
        id: format!("sub_{}", submission.id),
        kind: NotificationKind::Submission,
        message: format!("{} submitted \"{}\"", who, assignment_title),
        date,
    }
}

fn attendance_item(record: AttendanceRecord) -> NotificationItem {
    let date = record.date.as_deref().and_then(parse_timestamp);
    let day = date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "an unknown date".to_string());
    NotificationItem {
        id: format!("att_{}", record.id),
        kind: NotificationKind::Attendance,
        message: format!(
            "Attendance marked {} on {}",
            record.status.trim().to_ascii_lowercase(),
            day
        ),
        date,
    }
}

fn global_item(record: GlobalRecord) -> NotificationItem {
    NotificationItem {
        id: format!("global_{}", record.id),
        kind: NotificationKind::from_label(&record.kind),
        message: record.message,
        date: record.date.as_deref().and_then(parse_timestamp),
    }
}

/// Accepts RFC 3339, SQLite's `YYYY-MM-DD HH:MM:SS` and bare dates. Naive
/// values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
