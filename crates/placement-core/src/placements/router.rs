use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, ApplicationId, ApplicationStatus, DriveId, StudentId};
use super::repository::{
    ApplicationStore, DriveStore, NotificationDispatcher, RepositoryError, StudentStore,
};
use super::{PlacementEngine, PlacementError};

/// Router builder exposing the engine's HTTP surface.
///
/// Role/token middleware is layered on by the service binary; request bodies
/// carry the acting identity explicitly so the engine never sees untyped
/// data.
pub fn placement_router<S, N>(engine: Arc<PlacementEngine<S, N>>) -> Router
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/students/:student_id/drives/active",
            get(list_active_drives::<S, N>),
        )
        .route("/api/v1/drives/:drive_id/apply", post(apply_handler::<S, N>))
        .route("/api/v1/drives/:drive_id/close", put(close_drive_handler::<S, N>))
        .route(
            "/api/v1/drives/:drive_id/applications",
            get(drive_applications_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            delete(withdraw_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            put(update_status_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/bulk-update",
            post(bulk_update_handler::<S, N>),
        )
        .route(
            "/api/v1/hod/approvals/pending",
            get(pending_approvals_handler::<S, N>),
        )
        .route(
            "/api/v1/hod/approvals/:student_id/approve",
            put(approve_handler::<S, N>),
        )
        .route(
            "/api/v1/hod/approvals/:student_id/reject",
            put(reject_handler::<S, N>),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) student_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawRequest {
    pub(crate) student_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStatusRequest {
    pub(crate) status: ApplicationStatus,
    pub(crate) actor: Actor,
    #[serde(default)]
    pub(crate) comment: Option<String>,
    #[serde(default)]
    pub(crate) round: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkUpdateRequest {
    pub(crate) application_ids: Vec<String>,
    pub(crate) status: ApplicationStatus,
    pub(crate) actor: Actor,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovalRequest {
    pub(crate) actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub(crate) actor: Actor,
    pub(crate) reason: String,
}

fn error_response(err: &PlacementError) -> Response {
    let status = match err {
        PlacementError::Validation(_) => StatusCode::BAD_REQUEST,
        PlacementError::Eligibility { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PlacementError::DuplicateApplication
        | PlacementError::InvalidTransition { .. }
        | PlacementError::InvalidState(_) => StatusCode::CONFLICT,
        PlacementError::NotFound(_) => StatusCode::NOT_FOUND,
        PlacementError::Authorization => StatusCode::FORBIDDEN,
        PlacementError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PlacementError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        // A compare-and-swap loss: another actor committed first. The client
        // should refetch and retry, so this is a conflict, not a server bug.
        PlacementError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
    };

    let mut payload = json!({ "error": err.to_string() });
    if let PlacementError::Eligibility { reasons } = err {
        payload["failing_reasons"] = json!(reasons);
    }

    (status, Json(payload)).into_response()
}

pub(crate) async fn list_active_drives<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine
        .visibility
        .list_open_drives(&StudentId(student_id), Utc::now())
    {
        Ok(drives) => (StatusCode::OK, Json(json!({ "drives": drives }))).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn apply_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(drive_id): Path<String>,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine.lifecycle.apply(
        &StudentId(request.student_id),
        &DriveId(drive_id),
        Utc::now(),
    ) {
        Ok(application) => (
            StatusCode::CREATED,
            Json(json!({ "application": application })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn close_drive_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(drive_id): Path<String>,
    Json(request): Json<ApprovalRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine
        .lifecycle
        .close_drive(&DriveId(drive_id), &request.actor)
    {
        Ok(drive) => (StatusCode::OK, Json(json!({ "drive": drive }))).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn drive_applications_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(drive_id): Path<String>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine.lifecycle.drive_applications(&DriveId(drive_id)) {
        Ok(applications) => (
            StatusCode::OK,
            Json(json!({ "applications": applications })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn withdraw_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<WithdrawRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine.lifecycle.withdraw(
        &ApplicationId(application_id),
        &StudentId(request.student_id),
    ) {
        Ok(application) => (
            StatusCode::OK,
            Json(json!({ "success": true, "application": application })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn update_status_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine.lifecycle.update_status(
        &ApplicationId(application_id),
        request.status,
        request.actor,
        request.comment,
        request.round,
    ) {
        Ok(update) => (
            StatusCode::OK,
            Json(json!({ "application": update.application })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn bulk_update_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Json(request): Json<BulkUpdateRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let application_ids: Vec<ApplicationId> = request
        .application_ids
        .into_iter()
        .map(ApplicationId)
        .collect();

    match engine.lifecycle.bulk_update_status(
        &application_ids,
        request.status,
        request.actor,
        request.comment,
    ) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn pending_approvals_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine.approvals.pending() {
        Ok(students) => (StatusCode::OK, Json(json!({ "students": students }))).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn approve_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(student_id): Path<String>,
    Json(request): Json<ApprovalRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine
        .approvals
        .approve(&StudentId(student_id), &request.actor)
    {
        Ok(student) => (
            StatusCode::OK,
            Json(json!({ "success": true, "student": student })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn reject_handler<S, N>(
    State(engine): State<Arc<PlacementEngine<S, N>>>,
    Path(student_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Response
where
    S: DriveStore + StudentStore + ApplicationStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match engine
        .approvals
        .reject(&StudentId(student_id), &request.actor, request.reason)
    {
        Ok(student) => (
            StatusCode::OK,
            Json(json!({ "success": true, "student": student })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}
