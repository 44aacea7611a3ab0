use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const SUBJECTS: &str = "subjects";
pub const ATTENDANCE: &str = "attendance";
pub const USERS: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfPresent,
    HalfAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub code: String,
    pub credits: u32,
}

/// Stored shape of a subject; the id is the document key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDocument {
    pub owner_id: String,
    pub name: String,
    pub code: String,
    #[serde(default = "default_credits")]
    pub credits: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub owner_id: String,
    pub subject_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Stored shape of an attendance mark, keyed by `record_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDocument {
    pub owner_id: String,
    pub subject_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceDocument {
    pub fn record(&self) -> AttendanceRecord {
        AttendanceRecord {
            owner_id: self.owner_id.clone(),
            subject_id: self.subject_id.clone(),
            date: self.date,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// At most one record per subject per day.
pub fn record_key(subject_id: &str, date: NaiveDate) -> String {
    format!("{subject_id}_{}", date_key(date))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn default_credits() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubjectRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub credits: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub phase: crate::session::SessionPhase,
    pub user: Option<Identity>,
}

#[derive(Debug, Serialize)]
pub struct SubjectStatsResponse {
    #[serde(flatten)]
    pub subject: Subject,
    pub stats: StatsView,
}

#[derive(Debug, Serialize)]
pub struct StatsView {
    pub percentage: f64,
    pub percentage_label: String,
    pub present_count: u32,
    pub absent_count: u32,
    pub half_count: u32,
    pub total: u32,
    pub standing: crate::stats::Standing,
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub subject_id: String,
    pub date: String,
    pub status: AttendanceStatus,
    pub stats: StatsView,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationOutcome {
    pub action: crate::confirm::ConfirmKind,
    pub subject_id: String,
    pub executed: bool,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreference {
    pub dark_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct CalendarCell {
    pub date: Option<String>,
    pub day: Option<u32>,
    pub status: Option<AttendanceStatus>,
    pub pending: bool,
}

#[derive(Debug, Serialize)]
pub struct MonthView {
    pub subject: Subject,
    pub month: crate::calendar::MonthRef,
    pub label: String,
    pub previous: crate::calendar::MonthRef,
    pub next: crate::calendar::MonthRef,
    pub cells: Vec<CalendarCell>,
    pub stats: StatsView,
}
