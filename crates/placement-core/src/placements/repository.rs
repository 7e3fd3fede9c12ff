use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Drive, DriveId, DriveStatus, Student, StudentId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Drive storage abstraction.
pub trait DriveStore: Send + Sync {
    fn insert_drive(&self, drive: Drive) -> Result<Drive, RepositoryError>;
    fn fetch_drive(&self, id: &DriveId) -> Result<Option<Drive>, RepositoryError>;
    fn list_drives(&self) -> Result<Vec<Drive>, RepositoryError>;
    fn update_drive_status(&self, id: &DriveId, status: DriveStatus)
        -> Result<(), RepositoryError>;
}

/// Student storage abstraction.
pub trait StudentStore: Send + Sync {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn update_student(&self, student: Student) -> Result<(), RepositoryError>;
    fn students_pending_approval(&self) -> Result<Vec<Student>, RepositoryError>;
}

/// Application storage abstraction.
///
/// Implementations must enforce, atomically within `insert_application`, the
/// uniqueness of non-withdrawn applications per (drive, student) pair:
/// concurrent identical inserts yield exactly one success and `Conflict` for
/// the rest. A check performed by the caller before inserting is not enough.
pub trait ApplicationStore: Send + Sync {
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    /// Compare-and-swap update: fails with `Conflict` when the stored status
    /// no longer matches `expected`, so no interleaved write is ever lost.
    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<(), RepositoryError>;
    fn find_active_application(
        &self,
        drive_id: &DriveId,
        student_id: &StudentId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn applications_for_drive(&self, drive_id: &DriveId)
        -> Result<Vec<Application>, RepositoryError>;
}

/// Outbound notification hook (e-mail or push adapters live behind this).
///
/// Dispatch is best-effort: callers log failures and carry on, the outcome
/// only feeds the sent/failed counters of bulk operations.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<DispatchReceipt, DispatchError>;
}

/// Payload handed to the dispatcher after a committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub application_id: ApplicationId,
    pub student_id: StudentId,
    pub details: BTreeMap<String, String>,
}

/// Acknowledgement returned by a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub recipient: String,
}

/// Notification transport error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
