use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    models::{
        attendance::{
            AttendanceDayResponse, AttendanceRangeQuery, AttendanceRecord, AutoCheckoutOutcome,
            CreateAttendanceManual, EmployeeAttendance, RoleScopedAttendance,
            UpdateAttendanceManual,
        },
        viewer::AuthUser,
    },
    state::AppState,
};

pub async fn check_in(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let employee_id = state.tracker.viewer_employee_id(&viewer).await?;
    let record = state.tracker.check_in(&employee_id).await?;
    Ok(Json(record))
}

pub async fn check_out(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let employee_id = state.tracker.viewer_employee_id(&viewer).await?;
    let record = state.tracker.check_out(&employee_id).await?;
    Ok(Json(record))
}

pub async fn today(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
) -> Result<Json<Option<AttendanceDayResponse>>, AppError> {
    let record = state.tracker.today(&viewer).await?;
    Ok(Json(record))
}

pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Query(query): Query<AttendanceRangeQuery>,
) -> Result<Json<EmployeeAttendance>, AppError> {
    let view = state.tracker.history(&viewer, &query).await?;
    Ok(Json(view))
}

/// Everyone the viewer may see, widened by role.
pub async fn overview(
    State(state): State<AppState>,
    Extension(viewer): Extension<AuthUser>,
    Query(query): Query<AttendanceRangeQuery>,
) -> Result<Json<RoleScopedAttendance>, AppError> {
    let view = state.tracker.role_scoped_attendance(&viewer, &query).await?;
    Ok(Json(view))
}

pub async fn admin_create(
    State(state): State<AppState>,
    Json(payload): Json<CreateAttendanceManual>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    let record = state.tracker.create_manual(&payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn admin_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAttendanceManual>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let record = state.tracker.update_record(&id, &payload).await?;
    Ok(Json(record))
}

pub async fn admin_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tracker.delete_record(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Manual trigger for the end-of-day batch; the scheduler hits the same path.
pub async fn run_auto_checkout(
    State(state): State<AppState>,
) -> Result<Json<AutoCheckoutOutcome>, AppError> {
    let outcome = state.tracker.auto_checkout().await?;
    Ok(Json(outcome))
}
