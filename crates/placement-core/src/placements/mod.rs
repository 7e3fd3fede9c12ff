//! Placement drive eligibility and application lifecycle engine.
//!
//! The engine is split into a pure eligibility evaluator, a read-only drive
//! visibility service, the application state machine, and the HOD profile
//! approval workflow. All of them sit on top of narrow store traits so the
//! same code runs against the in-memory store in tests and against a real
//! database adapter in production.

pub mod approval;
pub mod domain;
pub mod eligibility;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod visibility;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use approval::ApprovalWorkflow;
pub use domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, Drive, DriveId, DriveStatus,
    DriveView, EligibilityCriteria, ProfileStatus, StatusChange, Student, StudentId,
};
pub use eligibility::{evaluate, EligibilityReason, EligibilityVerdict};
pub use lifecycle::{
    ApplicationLifecycleManager, BulkItemOutcome, BulkUpdateOutcome, StatusUpdateOutcome,
};
pub use repository::{
    ApplicationStore, DispatchError, DispatchReceipt, DriveStore, Notification,
    NotificationDispatcher, RepositoryError, StudentStore,
};
pub use router::placement_router;
pub use visibility::DriveVisibilityService;

/// Error raised by the engine's operations.
///
/// Single-item operations surface the first failure directly with no partial
/// effect; bulk updates isolate these per item instead of raising.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("student fails eligibility checks: {}", .reasons.iter().map(|reason| reason.label()).collect::<Vec<_>>().join(", "))]
    Eligibility { reasons: BTreeSet<EligibilityReason> },
    #[error("an active application for this drive already exists")]
    DuplicateApplication,
    #[error("no transition from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("{0}")]
    InvalidState(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("actor is not permitted to perform this action")]
    Authorization,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Bundle of the engine services sharing one store and one dispatcher,
/// handed to the HTTP router as shared state.
pub struct PlacementEngine<S, N> {
    pub visibility: DriveVisibilityService<S>,
    pub lifecycle: ApplicationLifecycleManager<S, N>,
    pub approvals: ApprovalWorkflow<S>,
}

impl<S, N> PlacementEngine<S, N>
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<N>) -> Self {
        Self {
            visibility: DriveVisibilityService::new(store.clone()),
            lifecycle: ApplicationLifecycleManager::new(store.clone(), dispatcher),
            approvals: ApprovalWorkflow::new(store),
        }
    }
}
