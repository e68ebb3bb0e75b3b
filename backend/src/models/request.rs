use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One employee's ask for leave, time off, overtime, an attendance
/// correction, or a loan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct WorkforceRequest {
    pub id: String,
    pub employee_id: String,
    pub tenant_id: String,
    pub kind: RequestKind,
    #[sqlx(json)]
    pub details: RequestDetails,
    /// Forced true when the derived leave hours exceed one standard workday
    /// or when the kind is Loan.
    pub admin_approval: bool,
    /// Server-set at creation, immutable afterwards.
    pub applied_date: DateTime<Utc>,
    pub status: WorkflowStatus,
    pub action_by: Option<String>,
    pub decision_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Leave,
    TimeOff,
    Overtime,
    AttendanceCorrection,
    Loan,
}

impl RequestKind {
    pub fn db_value(&self) -> &'static str {
        match self {
            RequestKind::Leave => "leave",
            RequestKind::TimeOff => "time_off",
            RequestKind::Overtime => "overtime",
            RequestKind::AttendanceCorrection => "attendance_correction",
            RequestKind::Loan => "loan",
        }
    }
}

/// Kind-specific payload. Exactly one variant is populated and it always
/// matches the request's `kind` column; "payload missing for kind" is not a
/// representable state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestDetails {
    Leave {
        leave_type: String,
        reason: String,
        from: NaiveDate,
        to: NaiveDate,
        /// Derived server-side; client-supplied values are overwritten.
        #[serde(default)]
        total_hours: f64,
        #[serde(default)]
        documents: Vec<String>,
    },
    TimeOff {
        reason: String,
        from_hour: String,
        to_hour: String,
        #[serde(default)]
        total_hours: f64,
    },
    Overtime {
        reason: String,
        from_hour: String,
        to_hour: String,
        #[serde(default)]
        total_hours: f64,
    },
    AttendanceCorrection {
        reason: String,
        attendance_id: String,
        proposed_check_in: NaiveDateTime,
        proposed_check_out: NaiveDateTime,
    },
    Loan {
        amount: f64,
        loan_type: String,
        duration_months: u32,
        purpose: String,
        /// Derived server-side: amount / duration, 2-decimal rounding.
        #[serde(default)]
        installment: f64,
    },
}

impl RequestDetails {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestDetails::Leave { .. } => RequestKind::Leave,
            RequestDetails::TimeOff { .. } => RequestKind::TimeOff,
            RequestDetails::Overtime { .. } => RequestKind::Overtime,
            RequestDetails::AttendanceCorrection { .. } => RequestKind::AttendanceCorrection,
            RequestDetails::Loan { .. } => RequestKind::Loan,
        }
    }

    /// Inclusive leave date range, when this is a leave payload.
    pub fn leave_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            RequestDetails::Leave { from, to, .. } => Some((*from, *to)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Approved,
    Rejected,
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        WorkflowStatus::Pending
    }
}

impl WorkflowStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Rejected => "rejected",
        }
    }
}

/// Valid transition targets. Pending is a creation-time value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Approved,
    Rejected,
}

impl From<DecisionStatus> for WorkflowStatus {
    fn from(decision: DecisionStatus) -> Self {
        match decision {
            DecisionStatus::Approved => WorkflowStatus::Approved,
            DecisionStatus::Rejected => WorkflowStatus::Rejected,
        }
    }
}

impl WorkforceRequest {
    pub fn new(
        employee_id: String,
        tenant_id: String,
        details: RequestDetails,
        admin_approval: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id,
            tenant_id,
            kind: details.kind(),
            details,
            admin_approval,
            applied_date: now,
            status: WorkflowStatus::Pending,
            action_by: None,
            decision_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, WorkflowStatus::Pending)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkforceRequest {
    pub employee_id: String,
    #[serde(flatten)]
    pub details: RequestDetails,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusPayload {
    pub status: DecisionStatus,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct RequestListQuery {
    pub kind: Option<RequestKind>,
    pub status: Option<WorkflowStatus>,
    /// Free-text match against the employee's resolved display name.
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkforceRequestResponse {
    #[serde(flatten)]
    pub request: WorkforceRequest,
    pub employee_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestSummary {
    pub total_requests: usize,
    pub my_requests: usize,
    pub team_requests: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestListPageInfo {
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestListResponse {
    pub my_requests: Vec<WorkforceRequestResponse>,
    pub team_requests: Vec<WorkforceRequestResponse>,
    pub summary: RequestSummary,
    pub page_info: RequestListPageInfo,
}
