use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppError,
    services::payroll::{LoanProjection, OvertimeProjection, PayrollPeriod},
    state::AppState,
};

pub async fn overtime_hours(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    Query(period): Query<PayrollPeriod>,
) -> Result<Json<OvertimeProjection>, AppError> {
    let projection = state.payroll.overtime_hours(&employee_id, period).await?;
    Ok(Json(projection))
}

pub async fn loans(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<Json<LoanProjection>, AppError> {
    let projection = state.payroll.loans(&employee_id).await?;
    Ok(Json(projection))
}
