#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    models::{
        attendance::{
            AttendanceDayResponse, AttendanceRangeQuery, AttendanceRecord, AttendanceStatus,
            AutoCheckoutOutcome, CreateAttendanceManual, DayClass, EmployeeAttendance,
            MonthlyStats, RoleScopedAttendance, UpdateAttendanceManual,
        },
        request::{
            ChangeStatusPayload, CreateWorkforceRequest, DecisionStatus, RequestDetails,
            RequestKind, RequestListPageInfo, RequestListQuery, RequestListResponse,
            RequestSummary, WorkflowStatus, WorkforceRequest, WorkforceRequestResponse,
        },
        viewer::{AuthUser, ViewerRole},
    },
    services::payroll::{LoanProjection, OvertimeProjection, PayrollPeriod},
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        check_in_doc,
        check_out_doc,
        attendance_today_doc,
        my_attendance_doc,
        attendance_overview_doc,
        create_request_doc,
        list_requests_doc,
        request_detail_doc,
        update_request_doc,
        remove_request_doc,
        change_status_doc,
        admin_create_attendance_doc,
        admin_update_attendance_doc,
        admin_delete_attendance_doc,
        auto_checkout_doc,
        payroll_overtime_doc,
        payroll_loans_doc
    ),
    components(
        schemas(
            // attendance
            AttendanceRecord,
            AttendanceStatus,
            AttendanceDayResponse,
            AttendanceRangeQuery,
            DayClass,
            MonthlyStats,
            EmployeeAttendance,
            RoleScopedAttendance,
            AutoCheckoutOutcome,
            CreateAttendanceManual,
            UpdateAttendanceManual,
            // requests
            WorkforceRequest,
            RequestKind,
            RequestDetails,
            WorkflowStatus,
            DecisionStatus,
            CreateWorkforceRequest,
            ChangeStatusPayload,
            RequestListQuery,
            RequestListResponse,
            RequestListPageInfo,
            RequestSummary,
            WorkforceRequestResponse,
            // payroll
            OvertimeProjection,
            LoanProjection,
            PayrollPeriod,
            // viewer
            AuthUser,
            ViewerRole
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Attendance", description = "Check-in/out, daily records, role-scoped views"),
        (name = "Requests", description = "Leave, time-off, overtime, correction and loan requests"),
        (name = "Admin", description = "Manual attendance, batch triggers, payroll projections")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Today's record (idempotent)", body = AttendanceRecord),
        (status = 400, description = "Non-working day or inactive employee")
    ),
    tag = "Attendance"
)]
fn check_in_doc() {}

#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Closed record (idempotent)", body = AttendanceRecord),
        (status = 404, description = "No check-in for today")
    ),
    tag = "Attendance"
)]
fn check_out_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses((status = 200, description = "Today's record with day class, if any")),
    tag = "Attendance"
)]
fn attendance_today_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(AttendanceRangeQuery),
    responses((status = 200, body = EmployeeAttendance)),
    tag = "Attendance"
)]
fn my_attendance_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/overview",
    params(AttendanceRangeQuery),
    responses((status = 200, description = "Role-scoped attendance", body = RoleScopedAttendance)),
    tag = "Attendance"
)]
fn attendance_overview_doc() {}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateWorkforceRequest,
    responses(
        (status = 201, body = WorkforceRequest),
        (status = 409, description = "Overlapping leave")
    ),
    tag = "Requests"
)]
fn create_request_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestListQuery),
    responses((status = 200, body = RequestListResponse)),
    tag = "Requests"
)]
fn list_requests_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    responses(
        (status = 200, body = WorkforceRequestResponse),
        (status = 403, description = "Not visible to this account")
    ),
    tag = "Requests"
)]
fn request_detail_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}",
    request_body = RequestDetails,
    responses(
        (status = 200, body = WorkforceRequest),
        (status = 409, description = "Already decided")
    ),
    tag = "Requests"
)]
fn update_request_doc() {}

#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    responses((status = 204, description = "Pending request withdrawn")),
    tag = "Requests"
)]
fn remove_request_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/status",
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, body = WorkforceRequest),
        (status = 409, description = "Already decided by someone else")
    ),
    tag = "Requests"
)]
fn change_status_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/attendance",
    request_body = CreateAttendanceManual,
    responses((status = 201, body = AttendanceRecord)),
    tag = "Admin"
)]
fn admin_create_attendance_doc() {}

#[utoipa::path(
    put,
    path = "/api/admin/attendance/{id}",
    request_body = UpdateAttendanceManual,
    responses((status = 200, body = AttendanceRecord)),
    tag = "Admin"
)]
fn admin_update_attendance_doc() {}

#[utoipa::path(
    delete,
    path = "/api/admin/attendance/{id}",
    responses((status = 204, description = "Record removed")),
    tag = "Admin"
)]
fn admin_delete_attendance_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/attendance/auto-checkout",
    responses((status = 200, description = "Batch outcome", body = AutoCheckoutOutcome)),
    tag = "Admin"
)]
fn auto_checkout_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/payroll/overtime/{employee_id}",
    params(PayrollPeriod),
    responses((status = 200, body = OvertimeProjection)),
    tag = "Admin"
)]
fn payroll_overtime_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/payroll/loans/{employee_id}",
    responses((status = 200, body = LoanProjection)),
    tag = "Admin"
)]
fn payroll_loans_doc() {}
