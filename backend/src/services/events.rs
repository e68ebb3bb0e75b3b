use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Emitted after a leave request's approval has been committed. Carries only
/// the working days of the leave range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveApproved {
    pub request_id: String,
    pub employee_id: String,
    pub tenant_id: String,
    pub dates: Vec<NaiveDate>,
}

/// Consumer of leave-approval events. The attendance side implements this to
/// backfill leave-day records; handling must stay idempotent so a redelivered
/// event is harmless.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaveApprovedSink: Send + Sync {
    async fn leave_approved(&self, event: LeaveApproved) -> Result<(), AppError>;
}
