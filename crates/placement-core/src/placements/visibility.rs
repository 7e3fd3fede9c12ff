use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{DriveView, StudentId};
use super::eligibility;
use super::repository::{ApplicationStore, DriveStore, StudentStore};
use super::PlacementError;

/// Read-only service producing the student-facing drive list.
///
/// Output may be stale the instant after return; there is no lock spanning
/// this read and any subsequent apply. The apply path re-checks everything.
pub struct DriveVisibilityService<S> {
    store: Arc<S>,
}

impl<S> DriveVisibilityService<S>
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// List drives open at `now` for the requesting student, annotated with
    /// eligibility and prior-application flags, ordered by deadline then id.
    ///
    /// Closed, cancelled, and past-deadline drives are excluded outright
    /// rather than flagged ineligible.
    pub fn list_open_drives(
        &self,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DriveView>, PlacementError> {
        let student = self
            .store
            .fetch_student(student_id)?
            .ok_or(PlacementError::NotFound("student"))?;

        let mut views = Vec::new();
        for drive in self.store.list_drives()? {
            if !drive.is_open(now) {
                continue;
            }

            let verdict = eligibility::evaluate(&student, &drive.criteria);
            let has_applied = self
                .store
                .find_active_application(&drive.id, student_id)?
                .is_some();

            views.push(DriveView {
                drive_id: drive.id,
                company_id: drive.company_id,
                job_role: drive.job_role,
                package: drive.package,
                job_type: drive.job_type,
                location: drive.location,
                application_deadline: drive.application_deadline,
                drive_date: drive.drive_date,
                is_eligible: verdict.eligible,
                failing_reasons: verdict.failing_reasons,
                has_applied,
            });
        }

        views.sort_by(|a, b| {
            a.application_deadline
                .cmp(&b.application_deadline)
                .then_with(|| a.drive_id.cmp(&b.drive_id))
        });

        Ok(views)
    }
}
