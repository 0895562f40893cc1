//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the HTTP
//! layer. Dates serialize as `YYYY-MM-DD`, timestamps as RFC 3339.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use resume_shared::Role;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account: an administrator, a reporting section, or a read-only viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a [`User`]; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One submitted service report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: i64,
    /// The section (user) owning this report.
    pub section_id: i64,
    /// Service date.
    pub date: NaiveDate,
    pub preacher: String,
    /// Supplied independently of the sub-counts below.
    pub total_attendees: i64,
    pub men: i64,
    pub women: i64,
    pub children: i64,
    pub youth: i64,
    /// Offering amount in [`Report::currency`].
    pub offering: f64,
    /// Always `XOF`.
    pub currency: String,
    pub notes: Option<String>,
    /// Username of the submitter at submission time.
    pub submitted_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Inclusive date filter; a `None` bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Weekly aggregate
// ---------------------------------------------------------------------------

/// Totals of one section's reports over one Monday-anchored week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyAggregate {
    pub id: i64,
    pub section_id: i64,
    /// Monday.
    pub week_start: NaiveDate,
    /// Sunday, `week_start + 6 days`.
    pub week_end: NaiveDate,
    pub total_offering: f64,
    pub currency: String,
    pub total_attendees: i64,
    pub total_services: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
