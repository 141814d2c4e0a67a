//! Database models
//!
//! Closed enumerations for every status/role column plus the record types
//! read back from storage. Enum columns are stored as their display text.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

// ========================================
// Roles
// ========================================

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Attendee,
    Author,
    Reviewer,
    Chair,
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Attendee,
        Role::Author,
        Role::Reviewer,
        Role::Chair,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Attendee => "Attendee",
            Role::Author => "Author",
            Role::Reviewer => "Reviewer",
            Role::Chair => "Chair",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::validation("role", format!("unknown role '{}'", s)))
    }
}

// ========================================
// Conference enums
// ========================================

/// How a conference is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConferenceMode {
    #[serde(rename = "In-Person")]
    InPerson,
    Online,
    Hybrid,
}

impl ConferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConferenceMode::InPerson => "In-Person",
            ConferenceMode::Online => "Online",
            ConferenceMode::Hybrid => "Hybrid",
        }
    }
}

impl FromStr for ConferenceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "In-Person" => Ok(ConferenceMode::InPerson),
            "Online" => Ok(ConferenceMode::Online),
            "Hybrid" => Ok(ConferenceMode::Hybrid),
            other => Err(Error::validation("mode", format!("unknown mode '{}'", other))),
        }
    }
}

/// Conference status, set explicitly by its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConferenceStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl ConferenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConferenceStatus::Upcoming => "upcoming",
            ConferenceStatus::Ongoing => "ongoing",
            ConferenceStatus::Completed => "completed",
            ConferenceStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the conference still takes registrations and papers
    pub fn is_open(&self) -> bool {
        matches!(self, ConferenceStatus::Upcoming | ConferenceStatus::Ongoing)
    }
}

impl FromStr for ConferenceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upcoming" => Ok(ConferenceStatus::Upcoming),
            "ongoing" => Ok(ConferenceStatus::Ongoing),
            "completed" => Ok(ConferenceStatus::Completed),
            "cancelled" => Ok(ConferenceStatus::Cancelled),
            other => Err(Error::validation("status", format!("unknown status '{}'", other))),
        }
    }
}

/// Registration status
///
/// Registrations are created `Confirmed`; the other states exist for data
/// imported from elsewhere and for future workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "Pending",
            RegistrationStatus::Confirmed => "Confirmed",
            RegistrationStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(RegistrationStatus::Pending),
            "Confirmed" => Ok(RegistrationStatus::Confirmed),
            "Cancelled" => Ok(RegistrationStatus::Cancelled),
            other => Err(Error::Internal(format!("unknown registration status '{}'", other))),
        }
    }
}

// ========================================
// Records
// ========================================

/// Editable profile fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub affiliation: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
}

/// Live user record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub is_phone_verified: bool,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Both verification channels confirmed
    pub fn is_fully_verified(&self) -> bool {
        self.is_email_verified && self.is_phone_verified
    }

    /// Login gate: Admins are exempt from verification
    pub fn may_log_in(&self) -> bool {
        self.role == Role::Admin || self.is_fully_verified()
    }
}

/// Four-tier registration fee schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationFees {
    pub early_bird: f64,
    pub regular: f64,
    pub student: f64,
    pub late: f64,
}

impl RegistrationFees {
    fn tiers(&self) -> [(&'static str, f64); 4] {
        [
            ("earlyBird", self.early_bird),
            ("regular", self.regular),
            ("student", self.student),
            ("late", self.late),
        ]
    }
}

/// Conference contact details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// Conference fields supplied on create/update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub submission_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub location: String,
    pub mode: ConferenceMode,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub registration_fees: RegistrationFees,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub convenors: Vec<String>,
    #[serde(default = "default_conference_status")]
    pub status: ConferenceStatus,
}

fn default_conference_status() -> ConferenceStatus {
    ConferenceStatus::Upcoming
}

impl ConferenceDraft {
    /// Server-side checks that the client used to be trusted with
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title", "title is required"));
        }
        if self.end_date < self.start_date {
            return Err(Error::validation("endDate", "endDate must not be before startDate"));
        }
        if let Some(deadline) = self.submission_deadline {
            if deadline > self.end_date {
                return Err(Error::validation(
                    "submissionDeadline",
                    "submissionDeadline must not be after endDate",
                ));
            }
        }
        for (tier, fee) in self.registration_fees.tiers() {
            if !fee.is_finite() || fee < 0.0 {
                return Err(Error::validation(
                    "registrationFees",
                    format!("{} fee must be a non-negative amount", tier),
                ));
            }
        }
        Ok(())
    }
}

/// Stored conference
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: ConferenceDraft,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conference {
    /// Whether a paper may be submitted on `today`
    pub fn accepts_submissions_on(&self, today: NaiveDate) -> bool {
        self.details.status.is_open()
            && self
                .details
                .submission_deadline
                .map_or(true, |deadline| today <= deadline)
    }
}

/// Attendee ↔ conference registration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conference_id: Uuid,
    pub status: RegistrationStatus,
    pub intend_to_submit: bool,
    pub registered_at: DateTime<Utc>,
}

/// Paper submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub author_id: Uuid,
    pub conference_id: Uuid,
    /// Opaque reference to the uploaded manuscript
    pub file_url: String,
    pub status: super::SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Reviewer assignment and, once completed, its score
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub conference_id: Uuid,
    pub score: Option<i64>,
    pub feedback: Option<String>,
    pub status: super::ReviewStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
