use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    DocumentId, DocumentUpload, DocumentView, ProfileAction, Registration, ReviewDecision,
    UserId, UserRole,
};
use super::error::{ValidationError, VerificationError};
use super::repository::{RepositoryError, VerificationStore};
use super::requirements;
use super::service::VerificationService;
use crate::workflows::notifications::{EmailDispatch, NotificationId};

/// Header carrying the authenticated account id, set by the upstream gateway.
pub const ACTING_USER_HEADER: &str = "x-user-id";

/// Account on whose behalf the request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub UserId);

#[async_trait]
impl<T> FromRequestParts<T> for ActingUser
where
    T: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &T) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|id| ActingUser(UserId(id)))
            .ok_or_else(|| {
                let payload = json!({ "error": "missing or invalid x-user-id header" });
                (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
            })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub(crate) documents: Vec<DocumentUpload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) approved: bool,
    #[serde(default)]
    pub(crate) rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileStatusRequest {
    pub(crate) action: String,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

/// Router builder exposing registration, upload, review and notification endpoints.
pub fn verification_router<S, E>(service: Arc<VerificationService<S, E>>) -> Router
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    Router::new()
        .route("/api/v1/users", post(register_handler::<S, E>))
        .route(
            "/api/v1/users/:user_id/verification",
            get(verification_handler::<S, E>),
        )
        .route("/api/v1/requirements/:role", get(requirements_handler))
        .route(
            "/api/v1/documents",
            get(list_documents_handler::<S, E>).post(submit_handler::<S, E>),
        )
        .route(
            "/api/v1/documents/:document_id",
            get(document_handler::<S, E>),
        )
        .route("/api/v1/checklist", get(checklist_handler::<S, E>))
        .route(
            "/api/v1/admin/documents/pending",
            get(pending_handler::<S, E>),
        )
        .route(
            "/api/v1/admin/documents/:document_id/review",
            post(review_handler::<S, E>),
        )
        .route(
            "/api/v1/admin/users/:user_id/status",
            post(profile_status_handler::<S, E>),
        )
        .route(
            "/api/v1/notifications",
            get(notifications_handler::<S, E>),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<S, E>),
        )
        .with_state(service)
}

pub(crate) fn error_response(err: VerificationError) -> Response {
    let status = match &err {
        VerificationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationError::NotFound { .. } => StatusCode::NOT_FOUND,
        VerificationError::PermissionDenied => StatusCode::FORBIDDEN,
        VerificationError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        VerificationError::Repository(_) => {
            error!(error = %err, "verification request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, VerificationError>,
) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

fn document_views(documents: Vec<super::domain::Document>) -> Vec<DocumentView> {
    documents.iter().map(|document| document.view()).collect()
}

pub(crate) async fn register_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    axum::Json(registration): axum::Json<Registration>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(
        StatusCode::CREATED,
        service
            .register_user(registration)
            .map(|account| account.view()),
    )
}

pub(crate) async fn verification_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
    Path(user_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let target = UserId(user_id);
    let result = service
        .ensure_visible(viewer, target)
        .and_then(|()| service.get_verification_status(target));
    respond(StatusCode::OK, result)
}

pub(crate) async fn requirements_handler(Path(role): Path<String>) -> Response {
    match role.parse::<UserRole>() {
        Ok(role) => {
            let required: Vec<_> = requirements::required_document_types(role)
                .iter()
                .map(|kind| json!({ "document_type": kind, "label": kind.label() }))
                .collect();
            let payload = json!({
                "role": role,
                "required_documents": required,
                "allowed_document_types": requirements::allowed_document_types(role),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err.into()),
    }
}

pub(crate) async fn list_documents_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(
        StatusCode::OK,
        service.get_user_documents(viewer).map(document_views),
    )
}

pub(crate) async fn submit_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(owner): ActingUser,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(
        StatusCode::CREATED,
        service
            .submit_verification_documents(owner, request.documents)
            .map(document_views),
    )
}

pub(crate) async fn document_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
    Path(document_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(
        StatusCode::OK,
        service
            .document_for(viewer, DocumentId(document_id))
            .map(|document| document.view()),
    )
}

pub(crate) async fn checklist_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(StatusCode::OK, service.get_verification_status(viewer))
}

pub(crate) async fn pending_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let result = service
        .require_admin(viewer)
        .and_then(|_| service.get_pending_verifications())
        .map(document_views);
    respond(StatusCode::OK, result)
}

pub(crate) async fn review_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(admin): ActingUser,
    Path(document_id): Path<u64>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let result = ReviewDecision::from_parts(request.approved, request.rejection_reason)
        .map_err(VerificationError::from)
        .and_then(|decision| service.verify_document(DocumentId(document_id), admin, decision))
        .map(|document| document.view());
    respond(StatusCode::OK, result)
}

pub(crate) async fn profile_status_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(admin): ActingUser,
    Path(user_id): Path<u64>,
    axum::Json(request): axum::Json<ProfileStatusRequest>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let result = request
        .action
        .parse::<ProfileAction>()
        .map_err(|err: ValidationError| VerificationError::from(err))
        .and_then(|action| service.set_profile_status(UserId(user_id), admin, action, request.note))
        .map(|account| account.view());
    respond(StatusCode::OK, result)
}

pub(crate) async fn notifications_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(StatusCode::OK, service.notifications(viewer))
}

pub(crate) async fn mark_read_handler<S, E>(
    State(service): State<Arc<VerificationService<S, E>>>,
    ActingUser(viewer): ActingUser,
    Path(notification_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    respond(
        StatusCode::OK,
        service.mark_notification_read(viewer, NotificationId(notification_id)),
    )
}
