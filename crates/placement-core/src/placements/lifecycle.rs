use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, Drive, DriveId, DriveStatus,
    ProfileStatus, StatusChange, StudentId,
};
use super::eligibility;
use super::repository::{
    ApplicationStore, DriveStore, Notification, NotificationDispatcher, RepositoryError,
    StudentStore,
};
use super::PlacementError;

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Owns the application state machine: apply, single and bulk status
/// updates, and student withdrawal.
pub struct ApplicationLifecycleManager<S, N> {
    store: Arc<S>,
    dispatcher: Arc<N>,
}

/// Result of a committed single status update, including whether the
/// best-effort notification went out.
#[derive(Debug, Clone)]
pub struct StatusUpdateOutcome {
    pub application: Application,
    pub notified: bool,
}

/// Aggregate result of a bulk update. Partial success is the intended
/// behavior: one item's failure never rolls back the others.
#[derive(Debug, Clone, Serialize)]
pub struct BulkUpdateOutcome {
    pub updated_count: usize,
    pub failed_count: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub items: Vec<BulkItemOutcome>,
}

/// Per-item outcome of a bulk update, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemOutcome {
    pub application_id: ApplicationId,
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<S, N> ApplicationLifecycleManager<S, N>
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<N>) -> Self {
        Self { store, dispatcher }
    }

    /// Create a new application after re-checking every gate.
    ///
    /// Duplicate prevention happens inside `insert_application`, where the
    /// store enforces uniqueness of the non-withdrawn (drive, student) pair
    /// in one atomic step: N concurrent identical calls commit exactly one
    /// row and the rest surface as `DuplicateApplication`.
    pub fn apply(
        &self,
        student_id: &StudentId,
        drive_id: &DriveId,
        now: DateTime<Utc>,
    ) -> Result<Application, PlacementError> {
        let drive = self
            .store
            .fetch_drive(drive_id)?
            .ok_or(PlacementError::NotFound("drive"))?;
        if !drive.is_open(now) {
            return Err(PlacementError::InvalidState(
                "drive is not open for applications".to_string(),
            ));
        }

        let student = self
            .store
            .fetch_student(student_id)?
            .ok_or(PlacementError::NotFound("student"))?;
        if student.profile_status != ProfileStatus::Approved {
            return Err(PlacementError::Authorization);
        }

        let verdict = eligibility::evaluate(&student, &drive.criteria);
        if !verdict.eligible {
            return Err(PlacementError::Eligibility {
                reasons: verdict.failing_reasons,
            });
        }

        let actor = Actor::student(student_id);
        let application = Application {
            id: next_application_id(),
            drive_id: drive_id.clone(),
            student_id: student_id.clone(),
            status: ApplicationStatus::Applied,
            current_round: None,
            applied_at: now,
            status_history: vec![StatusChange {
                status: ApplicationStatus::Applied,
                actor,
                at: now,
                comment: None,
            }],
        };

        let stored = self
            .store
            .insert_application(application)
            .map_err(|err| match err {
                RepositoryError::Conflict => PlacementError::DuplicateApplication,
                other => PlacementError::Repository(other),
            })?;

        info!(
            application_id = %stored.id.0,
            drive_id = %drive_id.0,
            student_id = %student_id.0,
            "application created"
        );
        Ok(stored)
    }

    /// Move one application along the state table and append to its history.
    ///
    /// The persist step is a compare-and-swap on the prior status, so two
    /// racing updates cannot both commit. The notification goes out after
    /// the commit and its failure never rolls the update back.
    pub fn update_status(
        &self,
        application_id: &ApplicationId,
        new_status: ApplicationStatus,
        actor: Actor,
        comment: Option<String>,
        round: Option<String>,
    ) -> Result<StatusUpdateOutcome, PlacementError> {
        let application = self
            .store
            .fetch_application(application_id)?
            .ok_or(PlacementError::NotFound("application"))?;

        // Terminal states need no separate check: they have no outgoing
        // edges, so the table rejects any update out of them.
        if !application.status.permits(new_status) {
            return Err(PlacementError::InvalidTransition {
                from: application.status,
                to: new_status,
            });
        }
        if new_status == ApplicationStatus::Withdrawn {
            // Withdrawal is student-owned; the dedicated withdraw path does
            // the ownership check, everyone else is turned away here.
            if actor.role != ActorRole::Student || actor.id != application.student_id.0 {
                return Err(PlacementError::Authorization);
            }
        }

        let expected = application.status;
        let mut updated = application;
        updated.status = new_status;
        if round.is_some() {
            updated.current_round = round;
        }
        updated.status_history.push(StatusChange {
            status: new_status,
            actor,
            at: Utc::now(),
            comment,
        });

        self.store.update_application(updated.clone(), expected)?;

        let notified = self.notify_transition(&updated);
        Ok(StatusUpdateOutcome {
            application: updated,
            notified,
        })
    }

    /// Apply `update_status` to each id independently, preserving input
    /// order. Raises only for malformed whole-call input; per-item failures
    /// are captured in the outcome.
    pub fn bulk_update_status(
        &self,
        application_ids: &[ApplicationId],
        new_status: ApplicationStatus,
        actor: Actor,
        comment: Option<String>,
    ) -> Result<BulkUpdateOutcome, PlacementError> {
        if application_ids.is_empty() {
            return Err(PlacementError::Validation(
                "application_ids must not be empty".to_string(),
            ));
        }

        let mut outcome = BulkUpdateOutcome {
            updated_count: 0,
            failed_count: 0,
            emails_sent: 0,
            emails_failed: 0,
            items: Vec::with_capacity(application_ids.len()),
        };

        for application_id in application_ids {
            match self.update_status(
                application_id,
                new_status,
                actor.clone(),
                comment.clone(),
                None,
            ) {
                Ok(update) => {
                    outcome.updated_count += 1;
                    if update.notified {
                        outcome.emails_sent += 1;
                    } else {
                        outcome.emails_failed += 1;
                    }
                    outcome.items.push(BulkItemOutcome {
                        application_id: application_id.clone(),
                        updated: true,
                        error: None,
                    });
                }
                Err(err) => {
                    outcome.failed_count += 1;
                    outcome.items.push(BulkItemOutcome {
                        application_id: application_id.clone(),
                        updated: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Student-initiated withdrawal, allowed from applied or shortlisted.
    ///
    /// A withdrawn application stops blocking the (drive, student) pair, so
    /// a later apply creates a fresh row with a new id.
    pub fn withdraw(
        &self,
        application_id: &ApplicationId,
        student_id: &StudentId,
    ) -> Result<Application, PlacementError> {
        let application = self
            .store
            .fetch_application(application_id)?
            .ok_or(PlacementError::NotFound("application"))?;

        if application.student_id != *student_id {
            return Err(PlacementError::Authorization);
        }
        if !matches!(
            application.status,
            ApplicationStatus::Applied | ApplicationStatus::Shortlisted
        ) {
            return Err(PlacementError::InvalidState(format!(
                "cannot withdraw a {} application",
                application.status.label()
            )));
        }

        let expected = application.status;
        let mut updated = application;
        updated.status = ApplicationStatus::Withdrawn;
        updated.status_history.push(StatusChange {
            status: ApplicationStatus::Withdrawn,
            actor: Actor::student(student_id),
            at: Utc::now(),
            comment: None,
        });

        self.store.update_application(updated.clone(), expected)?;

        self.notify_transition(&updated);
        Ok(updated)
    }

    /// All applications for a drive, withdrawn ones included, ordered by
    /// submission time then id. Feeds the placement office's applicant view
    /// and the id lists it sends back through bulk updates.
    pub fn drive_applications(
        &self,
        drive_id: &DriveId,
    ) -> Result<Vec<Application>, PlacementError> {
        self.store
            .fetch_drive(drive_id)?
            .ok_or(PlacementError::NotFound("drive"))?;

        let mut applications = self.store.applications_for_drive(drive_id)?;
        applications.sort_by(|a, b| {
            a.applied_at
                .cmp(&b.applied_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(applications)
    }

    /// Manual close by the placement office. Closed drives drop out of
    /// listings immediately; existing applications continue their lifecycle.
    pub fn close_drive(&self, drive_id: &DriveId, actor: &Actor) -> Result<Drive, PlacementError> {
        if actor.role != ActorRole::Tpo {
            return Err(PlacementError::Authorization);
        }

        let mut drive = self
            .store
            .fetch_drive(drive_id)?
            .ok_or(PlacementError::NotFound("drive"))?;

        match drive.status {
            DriveStatus::Closed => Ok(drive),
            DriveStatus::Cancelled => Err(PlacementError::InvalidState(
                "drive has been cancelled".to_string(),
            )),
            DriveStatus::Active => {
                self.store
                    .update_drive_status(drive_id, DriveStatus::Closed)?;
                drive.status = DriveStatus::Closed;
                info!(drive_id = %drive_id.0, actor = %actor.id, "drive closed");
                Ok(drive)
            }
        }
    }

    /// Best-effort dispatch after a committed transition. Failures are
    /// logged and reported to the caller only as a counter input.
    fn notify_transition(&self, application: &Application) -> bool {
        let mut details = BTreeMap::new();
        details.insert("drive_id".to_string(), application.drive_id.0.clone());
        details.insert(
            "status".to_string(),
            application.status.label().to_string(),
        );

        let notification = Notification {
            template: format!("application_{}", application.status.label()),
            application_id: application.id.clone(),
            student_id: application.student_id.clone(),
            details,
        };

        match self.dispatcher.dispatch(notification) {
            Ok(receipt) => {
                info!(
                    application_id = %application.id.0,
                    recipient = %receipt.recipient,
                    status = application.status.label(),
                    "transition notification sent"
                );
                true
            }
            Err(err) => {
                warn!(
                    application_id = %application.id.0,
                    error = %err,
                    "transition notification failed"
                );
                false
            }
        }
    }
}
