use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility::EligibilityReason;

/// Identifier wrapper for recruitment drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriveId(pub String);

/// Identifier wrapper for student accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Drive-side constraints a student must satisfy to apply.
///
/// Empty `allowed_departments` or `graduation_years` means the dimension is
/// unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub min_cgpa: f32,
    pub allowed_departments: BTreeSet<String>,
    pub max_backlogs: u32,
    pub graduation_years: BTreeSet<i32>,
}

/// Lifecycle state of a posted drive. Drives are never deleted, only closed
/// or cancelled by the placement office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStatus {
    Active,
    Closed,
    Cancelled,
}

impl DriveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DriveStatus::Active => "active",
            DriveStatus::Closed => "closed",
            DriveStatus::Cancelled => "cancelled",
        }
    }
}

/// A recruitment opportunity posted by the placement office.
///
/// `package` is an opaque display string ("12 LPA", "₹8,00,000"); numeric
/// aggregation belongs to reporting collaborators, not this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub id: DriveId,
    pub company_id: String,
    pub job_role: String,
    pub package: String,
    pub job_type: String,
    pub location: String,
    pub application_deadline: DateTime<Utc>,
    pub drive_date: DateTime<Utc>,
    pub status: DriveStatus,
    pub criteria: EligibilityCriteria,
}

impl Drive {
    /// A drive accepts applications only while active and before its deadline.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == DriveStatus::Active && now < self.application_deadline
    }
}

/// HOD review state gating a student profile. Mutated only by the approval
/// workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Incomplete,
    Pending,
    Approved,
    Rejected,
}

impl ProfileStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProfileStatus::Incomplete => "incomplete",
            ProfileStatus::Pending => "pending",
            ProfileStatus::Approved => "approved",
            ProfileStatus::Rejected => "rejected",
        }
    }
}

/// Student account snapshot used for eligibility checks and approvals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    /// CGPA on a 0-10 scale; absent until the student completes their profile.
    pub cgpa: Option<f32>,
    pub department: String,
    pub backlogs: u32,
    pub graduation_year: i32,
    pub profile_status: ProfileStatus,
    pub rejection_reason: Option<String>,
}

/// Role of the actor performing an operation, recorded in status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Student,
    Hod,
    Tpo,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Hod => "hod",
            ActorRole::Tpo => "tpo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    pub id: String,
}

impl Actor {
    pub fn student(id: &StudentId) -> Self {
        Self {
            role: ActorRole::Student,
            id: id.0.clone(),
        }
    }
}

/// Application state machine.
///
/// ```text
/// applied --> shortlisted --> selected   (terminal)
/// applied --> shortlisted --> rejected   (terminal)
/// applied --> rejected                   (terminal)
/// applied --> withdrawn                  (terminal, student-initiated)
/// shortlisted --> withdrawn              (terminal, student-initiated)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Selected,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Selected => "selected",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Selected | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Whether the state table contains an edge from `self` to `next`.
    pub const fn permits(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Applied, ApplicationStatus::Shortlisted)
                | (ApplicationStatus::Applied, ApplicationStatus::Rejected)
                | (ApplicationStatus::Applied, ApplicationStatus::Withdrawn)
                | (ApplicationStatus::Shortlisted, ApplicationStatus::Selected)
                | (ApplicationStatus::Shortlisted, ApplicationStatus::Rejected)
                | (ApplicationStatus::Shortlisted, ApplicationStatus::Withdrawn)
        )
    }
}

/// One append-only entry in an application's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub actor: Actor,
    pub at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// The record of one student's candidacy for one drive.
///
/// At most one non-withdrawn application may exist per (drive, student)
/// pair; the store enforces that uniqueness atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub drive_id: DriveId,
    pub student_id: StudentId,
    pub status: ApplicationStatus,
    pub current_round: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub status_history: Vec<StatusChange>,
}

/// Student-facing projection of an open drive with eligibility annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveView {
    pub drive_id: DriveId,
    pub company_id: String,
    pub job_role: String,
    pub package: String,
    pub job_type: String,
    pub location: String,
    pub application_deadline: DateTime<Utc>,
    pub drive_date: DateTime<Utc>,
    pub is_eligible: bool,
    pub failing_reasons: BTreeSet<EligibilityReason>,
    pub has_applied: bool,
}
