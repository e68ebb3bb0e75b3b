use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    models::{
        request::{
            ChangeStatusPayload, CreateWorkforceRequest, RequestDetails, RequestListQuery,
            RequestListResponse, WorkforceRequest, WorkforceRequestResponse,
        },
        viewer::AuthUser,
    },
    state::AppState,
};

pub async fn create(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Json(payload): Json<CreateWorkforceRequest>,
) -> Result<(StatusCode, Json<WorkforceRequest>), AppError> {
    let request = state.workflow.create(&viewer, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<RequestListResponse>, AppError> {
    let response = state.workflow.role_scoped_requests(&viewer, &query).await?;
    Ok(Json(response))
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<WorkforceRequestResponse>, AppError> {
    let response = state.workflow.find_one(&viewer, &id).await?;
    Ok(Json(response))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(details): Json<RequestDetails>,
) -> Result<Json<WorkforceRequest>, AppError> {
    let request = state.workflow.update(&viewer, &id, details).await?;
    Ok(Json(request))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.workflow.remove(&viewer, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve or reject. Managers can decide their reports' requests; anything
/// flagged for admin approval needs an admin token.
pub async fn change_status(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<Json<WorkforceRequest>, AppError> {
    let request = state.workflow.change_status(&viewer, &id, &payload).await?;
    Ok(Json(request))
}
