use std::sync::Arc;

use tracing::info;

use super::domain::{Actor, ActorRole, ProfileStatus, Student, StudentId};
use super::repository::StudentStore;
use super::PlacementError;

/// HOD review gate over `Student.profile_status`: pending profiles move to
/// approved or rejected, both terminal. Independent of the application
/// lifecycle.
pub struct ApprovalWorkflow<S> {
    store: Arc<S>,
}

impl<S> ApprovalWorkflow<S>
where
    S: StudentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Approve a pending profile. Idempotent on already-approved profiles;
    /// rejected profiles stay rejected.
    pub fn approve(&self, student_id: &StudentId, actor: &Actor) -> Result<Student, PlacementError> {
        let mut student = self.reviewable(student_id, actor)?;

        match student.profile_status {
            ProfileStatus::Approved => Ok(student),
            ProfileStatus::Rejected => Err(PlacementError::InvalidState(
                "profile has been rejected".to_string(),
            )),
            ProfileStatus::Incomplete => Err(PlacementError::InvalidState(
                "profile has not been submitted for review".to_string(),
            )),
            ProfileStatus::Pending => {
                student.profile_status = ProfileStatus::Approved;
                self.store.update_student(student.clone())?;
                info!(student_id = %student_id.0, actor = %actor.id, "profile approved");
                Ok(student)
            }
        }
    }

    /// Reject a pending profile, recording the reason. Idempotent on
    /// already-rejected profiles; approved profiles cannot be rejected.
    pub fn reject(
        &self,
        student_id: &StudentId,
        actor: &Actor,
        reason: String,
    ) -> Result<Student, PlacementError> {
        let mut student = self.reviewable(student_id, actor)?;

        match student.profile_status {
            ProfileStatus::Rejected => Ok(student),
            ProfileStatus::Approved => Err(PlacementError::InvalidState(
                "profile has already been approved".to_string(),
            )),
            ProfileStatus::Incomplete => Err(PlacementError::InvalidState(
                "profile has not been submitted for review".to_string(),
            )),
            ProfileStatus::Pending => {
                student.profile_status = ProfileStatus::Rejected;
                student.rejection_reason = Some(reason);
                self.store.update_student(student.clone())?;
                info!(student_id = %student_id.0, actor = %actor.id, "profile rejected");
                Ok(student)
            }
        }
    }

    /// Profiles awaiting review, for the HOD queue.
    pub fn pending(&self) -> Result<Vec<Student>, PlacementError> {
        Ok(self.store.students_pending_approval()?)
    }

    fn reviewable(
        &self,
        student_id: &StudentId,
        actor: &Actor,
    ) -> Result<Student, PlacementError> {
        if actor.role == ActorRole::Student {
            return Err(PlacementError::Authorization);
        }

        self.store
            .fetch_student(student_id)?
            .ok_or(PlacementError::NotFound("student"))
    }
}
