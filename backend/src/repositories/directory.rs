//! Organization directory interface.
//!
//! The directory (employees, reporting lines, tenants) is owned by an
//! external subsystem; the engine consumes it through this trait only.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::error::AppError;
use crate::models::employee::EmployeeRef;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationDirectoryTrait: Send + Sync {
    /// Resolve a single employee; NotFound for unknown ids.
    async fn resolve_employee(&self, db: &PgPool, employee_id: &str)
        -> Result<EmployeeRef, AppError>;

    /// Resolve the employee record attached to a user account, if any.
    async fn find_by_user(&self, db: &PgPool, user_id: &str)
        -> Result<Option<EmployeeRef>, AppError>;

    /// Every employee of a tenant, regardless of employment status. Admin
    /// views resolve through this so a former employee's history stays
    /// reachable.
    async fn list_tenant_employees(
        &self,
        db: &PgPool,
        tenant_id: &str,
    ) -> Result<Vec<EmployeeRef>, AppError>;

    /// All active employees of a tenant.
    async fn list_active_employees(
        &self,
        db: &PgPool,
        tenant_id: &str,
    ) -> Result<Vec<EmployeeRef>, AppError>;

    /// Employees whose `reporting_to` is the given manager's user id.
    async fn list_direct_reports(
        &self,
        db: &PgPool,
        manager_user_id: &str,
    ) -> Result<Vec<EmployeeRef>, AppError>;

    /// Tenants that have at least one active employee; drives the
    /// auto-checkout roster walk.
    async fn list_active_tenants(&self, db: &PgPool) -> Result<Vec<String>, AppError>;

    /// Display names for a set of employee ids.
    async fn display_names(
        &self,
        db: &PgPool,
        employee_ids: &[String],
    ) -> Result<HashMap<String, String>, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrganizationDirectory;

impl OrganizationDirectory {
    pub fn new() -> Self {
        Self
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, tenant_id, reporting_to, display_name, employment_status, created_at, updated_at";

#[async_trait]
impl OrganizationDirectoryTrait for OrganizationDirectory {
    async fn resolve_employee(
        &self,
        db: &PgPool,
        employee_id: &str,
    ) -> Result<EmployeeRef, AppError> {
        let query = format!("SELECT {} FROM employees WHERE id = $1", SELECT_COLUMNS);
        let employee = sqlx::query_as::<_, EmployeeRef>(&query)
            .bind(employee_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;
        Ok(employee)
    }

    async fn find_by_user(
        &self,
        db: &PgPool,
        user_id: &str,
    ) -> Result<Option<EmployeeRef>, AppError> {
        let query = format!("SELECT {} FROM employees WHERE user_id = $1", SELECT_COLUMNS);
        let employee = sqlx::query_as::<_, EmployeeRef>(&query)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        Ok(employee)
    }

    async fn list_tenant_employees(
        &self,
        db: &PgPool,
        tenant_id: &str,
    ) -> Result<Vec<EmployeeRef>, AppError> {
        let query = format!(
            "SELECT {} FROM employees WHERE tenant_id = $1 ORDER BY display_name",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EmployeeRef>(&query)
            .bind(tenant_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    async fn list_active_employees(
        &self,
        db: &PgPool,
        tenant_id: &str,
    ) -> Result<Vec<EmployeeRef>, AppError> {
        let query = format!(
            "SELECT {} FROM employees WHERE tenant_id = $1 AND LOWER(employment_status) = 'active' ORDER BY display_name",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EmployeeRef>(&query)
            .bind(tenant_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    async fn list_direct_reports(
        &self,
        db: &PgPool,
        manager_user_id: &str,
    ) -> Result<Vec<EmployeeRef>, AppError> {
        let query = format!(
            "SELECT {} FROM employees WHERE reporting_to = $1 ORDER BY display_name",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EmployeeRef>(&query)
            .bind(manager_user_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    async fn list_active_tenants(&self, db: &PgPool) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT tenant_id FROM employees WHERE LOWER(employment_status) = 'active'",
        )
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(|(tenant,)| tenant).collect())
    }

    async fn display_names(
        &self,
        db: &PgPool,
        employee_ids: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        if employee_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, display_name FROM employees WHERE id = ANY($1)")
                .bind(employee_ids)
                .fetch_all(db)
                .await?;
        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_directory_satisfies_trait_bounds() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockOrganizationDirectoryTrait>();
    }
}
