use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::models::request::{RequestDetails, WorkforceRequest};
use crate::repositories::RequestRepositoryTrait;
use crate::utils::time::round2;

/// Payroll period bounds, applied to the request's application date. An open
/// bound means "from the beginning" / "until now".
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams, ToSchema)]
pub struct PayrollPeriod {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OvertimeProjection {
    pub employee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    pub total_hours: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanProjection {
    pub employee_id: String,
    pub loans: Vec<WorkforceRequest>,
    pub total_outstanding: f64,
    pub monthly_installment: f64,
}

/// Read-only projections of approved requests for payroll consumers.
#[derive(Clone)]
pub struct PayrollProjection {
    db: PgPool,
    repo: Arc<dyn RequestRepositoryTrait>,
}

impl PayrollProjection {
    pub fn new(db: PgPool, repo: Arc<dyn RequestRepositoryTrait>) -> Self {
        Self { db, repo }
    }

    pub async fn overtime_hours(
        &self,
        employee_id: &str,
        period: PayrollPeriod,
    ) -> Result<OvertimeProjection, AppError> {
        if let (Some(from), Some(to)) = (period.from, period.to) {
            if from > to {
                return Err(AppError::BadRequest(
                    "Period start must not be after its end".to_string(),
                ));
            }
        }
        let total_hours = self
            .repo
            .approved_overtime_hours(&self.db, employee_id, period.from, period.to)
            .await?;
        Ok(OvertimeProjection {
            employee_id: employee_id.to_string(),
            from: period.from,
            to: period.to,
            total_hours: round2(total_hours),
        })
    }

    pub async fn loans(&self, employee_id: &str) -> Result<LoanProjection, AppError> {
        let loans = self.repo.approved_loans(&self.db, employee_id).await?;

        let mut total_outstanding = 0.0;
        let mut monthly_installment = 0.0;
        for loan in &loans {
            if let RequestDetails::Loan {
                amount, installment, ..
            } = &loan.details
            {
                total_outstanding += amount;
                monthly_installment += installment;
            }
        }

        Ok(LoanProjection {
            employee_id: employee_id.to_string(),
            loans,
            total_outstanding: round2(total_outstanding),
            monthly_installment: round2(monthly_installment),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::request_repository::MockRequestRepositoryTrait;

    fn test_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost/unused").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn overtime_projection_passes_the_period_to_the_store() {
        let mut repo = MockRequestRepositoryTrait::new();
        repo.expect_approved_overtime_hours()
            .times(1)
            .withf(|_, employee_id, from, to| {
                employee_id == "emp-1"
                    && *from == Some(date(2024, 6, 1))
                    && *to == Some(date(2024, 6, 30))
            })
            .returning(|_, _, _, _| Ok(12.5));

        let payroll = PayrollProjection::new(test_pool(), Arc::new(repo));
        let projection = payroll
            .overtime_hours(
                "emp-1",
                PayrollPeriod {
                    from: Some(date(2024, 6, 1)),
                    to: Some(date(2024, 6, 30)),
                },
            )
            .await
            .unwrap();
        assert_eq!(projection.total_hours, 12.5);
        assert_eq!(projection.from, Some(date(2024, 6, 1)));
    }

    #[tokio::test]
    async fn overtime_projection_rejects_an_inverted_period() {
        let repo = MockRequestRepositoryTrait::new();
        let payroll = PayrollProjection::new(test_pool(), Arc::new(repo));
        let err = payroll
            .overtime_hours(
                "emp-1",
                PayrollPeriod {
                    from: Some(date(2024, 7, 1)),
                    to: Some(date(2024, 6, 1)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
