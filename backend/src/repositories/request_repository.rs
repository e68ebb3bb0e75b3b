use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, QueryBuilder};

use crate::error::AppError;
use crate::models::request::{RequestKind, WorkflowStatus, WorkforceRequest};

/// Filters applied when listing requests for a set of employees.
#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub kind: Option<RequestKind>,
    pub status: Option<WorkflowStatus>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestRepositoryTrait: Send + Sync {
    async fn insert(&self, db: &PgPool, request: &WorkforceRequest) -> Result<(), AppError>;

    async fn find_by_id(
        &self,
        db: &PgPool,
        id: &str,
    ) -> Result<Option<WorkforceRequest>, AppError>;

    /// Non-rejected leave requests of an employee whose date range intersects
    /// the given range. Used to block overlapping leave at creation time.
    async fn find_overlapping_leave(
        &self,
        db: &PgPool,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WorkforceRequest>, AppError>;

    async fn update(&self, db: &PgPool, request: &WorkforceRequest) -> Result<(), AppError>;

    /// Guarded state transition: only fires while the row is still pending.
    /// Returns false when another decision won the race (or the id is gone),
    /// leaving the first decision in place.
    async fn transition(
        &self,
        db: &PgPool,
        id: &str,
        status: WorkflowStatus,
        action_by: &str,
        rejection_reason: Option<String>,
    ) -> Result<bool, AppError>;

    async fn find_for_employees(
        &self,
        db: &PgPool,
        employee_ids: &[String],
        filter: &RequestFilter,
    ) -> Result<Vec<WorkforceRequest>, AppError>;

    async fn delete(&self, db: &PgPool, id: &str) -> Result<bool, AppError>;

    /// Sum of derived hours across approved overtime requests of an employee,
    /// optionally bounded to a payroll period by application date.
    async fn approved_overtime_hours(
        &self,
        db: &PgPool,
        employee_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<f64, AppError>;

    /// Approved loan requests of an employee, newest decision first.
    async fn approved_loans(
        &self,
        db: &PgPool,
        employee_id: &str,
    ) -> Result<Vec<WorkforceRequest>, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestRepository;

impl RequestRepository {
    pub fn new() -> Self {
        Self
    }
}

const SELECT_COLUMNS: &str = "id, employee_id, tenant_id, kind, details, admin_approval, applied_date, status, action_by, decision_at, rejection_reason, created_at, updated_at";

#[async_trait]
impl RequestRepositoryTrait for RequestRepository {
    async fn insert(&self, db: &PgPool, request: &WorkforceRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO workforce_requests
                (id, employee_id, tenant_id, kind, details, admin_approval, applied_date,
                 status, action_by, decision_at, rejection_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&request.id)
        .bind(&request.employee_id)
        .bind(&request.tenant_id)
        .bind(request.kind.db_value())
        .bind(sqlx::types::Json(&request.details))
        .bind(request.admin_approval)
        .bind(request.applied_date)
        .bind(request.status.db_value())
        .bind(&request.action_by)
        .bind(request.decision_at)
        .bind(&request.rejection_reason)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(db)
        .await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        db: &PgPool,
        id: &str,
    ) -> Result<Option<WorkforceRequest>, AppError> {
        let query = format!(
            "SELECT {} FROM workforce_requests WHERE id = $1",
            SELECT_COLUMNS
        );
        let request = sqlx::query_as::<_, WorkforceRequest>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(request)
    }

    async fn find_overlapping_leave(
        &self,
        db: &PgPool,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WorkforceRequest>, AppError> {
        // Range intersection on the JSONB payload's from/to dates; rejected
        // requests do not block a new one.
        let query = format!(
            r#"
            SELECT {} FROM workforce_requests
            WHERE employee_id = $1
              AND kind = 'leave'
              AND status <> 'rejected'
              AND (details->>'from')::date <= $3
              AND (details->>'to')::date >= $2
            "#,
            SELECT_COLUMNS
        );
        let requests = sqlx::query_as::<_, WorkforceRequest>(&query)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(db)
            .await?;
        Ok(requests)
    }

    async fn update(&self, db: &PgPool, request: &WorkforceRequest) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE workforce_requests
            SET kind = $1, details = $2, admin_approval = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(request.kind.db_value())
        .bind(sqlx::types::Json(&request.details))
        .bind(request.admin_approval)
        .bind(request.updated_at)
        .bind(&request.id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Request not found".into()));
        }
        Ok(())
    }

    async fn transition(
        &self,
        db: &PgPool,
        id: &str,
        status: WorkflowStatus,
        action_by: &str,
        rejection_reason: Option<String>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE workforce_requests
            SET status = $1, action_by = $2, decision_at = NOW(),
                rejection_reason = $3, updated_at = NOW()
            WHERE id = $4 AND status = 'pending'
            "#,
        )
        .bind(status.db_value())
        .bind(action_by)
        .bind(rejection_reason)
        .bind(id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_for_employees(
        &self,
        db: &PgPool,
        employee_ids: &[String],
        filter: &RequestFilter,
    ) -> Result<Vec<WorkforceRequest>, AppError> {
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM workforce_requests WHERE employee_id = ANY(",
            SELECT_COLUMNS
        ));
        builder.push_bind(employee_ids).push(")");

        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind.db_value());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.db_value());
        }
        builder.push(" ORDER BY applied_date DESC");

        let requests = builder
            .build_query_as::<WorkforceRequest>()
            .fetch_all(db)
            .await?;
        Ok(requests)
    }

    async fn delete(&self, db: &PgPool, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM workforce_requests WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn approved_overtime_hours(
        &self,
        db: &PgPool,
        employee_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<f64, AppError> {
        let mut builder = QueryBuilder::new(
            "SELECT SUM((details->>'total_hours')::double precision) \
             FROM workforce_requests \
             WHERE kind = 'overtime' AND status = 'approved' AND employee_id = ",
        );
        builder.push_bind(employee_id);
        if let Some(from) = from {
            builder.push(" AND applied_date::date >= ").push_bind(from);
        }
        if let Some(to) = to {
            builder.push(" AND applied_date::date <= ").push_bind(to);
        }

        let (total,): (Option<f64>,) = builder.build_query_as().fetch_one(db).await?;
        Ok(total.unwrap_or(0.0))
    }

    async fn approved_loans(
        &self,
        db: &PgPool,
        employee_id: &str,
    ) -> Result<Vec<WorkforceRequest>, AppError> {
        let query = format!(
            r#"
            SELECT {} FROM workforce_requests
            WHERE employee_id = $1 AND kind = 'loan' AND status = 'approved'
            ORDER BY decision_at DESC NULLS LAST
            "#,
            SELECT_COLUMNS
        );
        let requests = sqlx::query_as::<_, WorkforceRequest>(&query)
            .bind(employee_id)
            .fetch_all(db)
            .await?;
        Ok(requests)
    }
}
