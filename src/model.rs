use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SchoolId = i64;
pub type SubjectId = i64;
pub type ClassroomId = i64;
pub type FeedbackId = i64;
pub type KeywordId = i64;
/// Server-issued UUID string; the console never mints these.
pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "gestor")]
    Manager,
    #[serde(rename = "professor")]
    Teacher,
    #[serde(rename = "aluno")]
    Student,
}

impl Role {
    /// Accepts both the wire names and their English aliases, the same set
    /// the backend tolerates in query parameters.
    pub fn parse(value: &str) -> Option<Role> {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "gestor" | "manager" => Some(Role::Manager),
            "professor" | "teacher" => Some(Role::Teacher),
            "aluno" | "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "gestor",
            Role::Teacher => "professor",
            Role::Student => "aluno",
        }
    }

    /// Roles that belong to exactly one school. Admins are network-wide.
    pub fn needs_school(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub school_id: SchoolId,
    /// Optional responsible teacher for the subject.
    #[serde(default)]
    pub teacher_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub school_id: SchoolId,
    /// Subjects taught in this classroom. Non-empty once finalized.
    #[serde(default)]
    pub subject_ids: Vec<SubjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub school_id: Option<SchoolId>,
    #[serde(default)]
    pub classroom_id: Option<ClassroomId>,
    /// Subjects a teacher is eligible to teach.
    #[serde(default)]
    pub teachable_subject_ids: Vec<SubjectId>,
    #[serde(default)]
    pub teaching_classroom_ids: Vec<ClassroomId>,
}

/// Payload for creating a person. The password travels in clear over the
/// authenticated channel; hashing is the server's job.
#[derive(Debug, Clone, Serialize)]
pub struct UserCreate {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<SchoolId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classroom_id: Option<ClassroomId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub teachable_subject_ids: Vec<SubjectId>,
}

/// Update payload. `None` fields are left untouched by the server; an absent
/// password means "keep the current credential".
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<SchoolId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classroom_id: Option<ClassroomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachable_subject_ids: Option<Vec<SubjectId>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchoolPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub school_id: SchoolId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassroomPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub school_id: SchoolId,
    pub subject_ids: Vec<SubjectId>,
}

/// One row of the per-classroom teacher map. An absent teacher means the
/// subject is still unassigned in that classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub teacher_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomAssignments {
    pub classroom_id: ClassroomId,
    pub assignments: Vec<AssignmentEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "class")]
    Class,
    #[serde(rename = "subject")]
    Subject,
}

/// Sentiment bucket. Absent or unrecognized wire labels fall into `Neutral`
/// so that the buckets always partition the event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn classify(label: Option<&str>) -> Sentiment {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("positivo") | Some("positive") => Sentiment::Positive,
            Some("negativo") | Some("negative") => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_role: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_school_id: Option<SchoolId>,
    pub target_type: TargetKind,
    /// Stringly typed on the wire: user UUIDs and numeric class/subject ids
    /// share this field.
    pub target_id: String,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub target_role: Option<String>,
    #[serde(default)]
    pub target_email: Option<String>,
    #[serde(default)]
    pub target_school_id: Option<SchoolId>,
    pub content: String,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub has_trigger: bool,
    #[serde(default)]
    pub manual_trigger_reason: Option<String>,
    #[serde(default)]
    pub manual_triggered_by: Option<UserId>,
    #[serde(default)]
    pub trigger_resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger_resolved_by: Option<UserId>,
    #[serde(default)]
    pub trigger_resolved_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn sentiment_bucket(&self) -> Sentiment {
        Sentiment::classify(self.sentiment_label.as_deref())
    }

    /// Trigger flag set and not yet resolved.
    pub fn is_active_alert(&self) -> bool {
        self.has_trigger && self.trigger_resolved_at.is_none()
    }

    pub fn is_resolved_alert(&self) -> bool {
        self.has_trigger && self.trigger_resolved_at.is_some()
    }

    /// Whether the alert came from a manual report rather than keyword
    /// matching. Immutable after creation.
    pub fn is_manual_report(&self) -> bool {
        self.manual_trigger_reason.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackCreate {
    pub target_type: TargetKind,
    pub target_id: String,
    pub content: String,
}

/// Sent and received halves of the caller's own feedback view.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackMine {
    pub sent: Vec<Feedback>,
    pub received: Vec<Feedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerKeyword {
    pub id: KeywordId,
    pub keyword: String,
    /// `None` means the keyword applies network-wide (administrator-owned).
    #[serde(default)]
    pub school_id: Option<SchoolId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSummary {
    pub summary_text: String,
    #[serde(default)]
    pub positives: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub gemma_ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricCounts {
    pub total_users: i64,
    pub total_schools: i64,
    pub total_classrooms: i64,
    pub total_subjects: i64,
    pub total_feedbacks: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerStats {
    pub active_alerts: i64,
    pub resolved_alerts_30d: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSnapshot {
    pub feedbacks_24h: i64,
    pub feedbacks_7d: i64,
    #[serde(default)]
    pub last_feedback_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsOverview {
    pub counts: MetricCounts,
    pub triggers: TriggerStats,
    pub feedback: FeedbackSnapshot,
}
