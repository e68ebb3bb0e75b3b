use sqlx::PgPool;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::employee::EmployeeRef;
use crate::models::viewer::AuthUser;
use crate::repositories::OrganizationDirectoryTrait;

/// How wide the resolved visibility is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Just the viewer's own records.
    Individual,
    /// The viewer plus their direct reports.
    Manager,
    /// Every employee of one tenant.
    Admin,
}

impl ScopeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeMode::Individual => "individual",
            ScopeMode::Manager => "manager",
            ScopeMode::Admin => "admin",
        }
    }
}

/// The set of employees a viewer may see. Both the attendance and the request
/// listings resolve through this so the two surfaces can never disagree on
/// visibility.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    pub mode: ScopeMode,
    /// The viewer's own employee id, when they have an employee record.
    pub viewer_employee_id: Option<String>,
    pub employees: Vec<EmployeeRef>,
}

impl ResolvedScope {
    pub fn employee_ids(&self) -> Vec<String> {
        self.employees.iter().map(|e| e.id.clone()).collect()
    }
}

#[derive(Clone)]
pub struct VisibilityResolver {
    directory: Arc<dyn OrganizationDirectoryTrait>,
}

impl VisibilityResolver {
    pub fn new(directory: Arc<dyn OrganizationDirectoryTrait>) -> Self {
        Self { directory }
    }

    /// Resolves the viewer's visible employee set.
    ///
    /// Admins see their whole tenant, terminated employees included, and
    /// must carry a tenant association; an admin token without one is
    /// rejected rather than silently widened to all tenants. Everyone else
    /// sees themselves plus any direct reports, which makes the manager role
    /// implicit in the reporting graph instead of a separate claim.
    pub async fn resolve(&self, db: &PgPool, viewer: &AuthUser) -> Result<ResolvedScope, AppError> {
        if viewer.is_admin() {
            let tenant_id = viewer.tenant_id.as_deref().ok_or_else(|| {
                AppError::Forbidden("Admin token carries no tenant association".into())
            })?;
            let employees = self.directory.list_tenant_employees(db, tenant_id).await?;
            let viewer_employee_id = viewer.employee_id.clone().or_else(|| {
                employees
                    .iter()
                    .find(|e| e.user_id == viewer.user_id)
                    .map(|e| e.id.clone())
            });
            return Ok(ResolvedScope {
                mode: ScopeMode::Admin,
                viewer_employee_id,
                employees,
            });
        }

        let own = match &viewer.employee_id {
            Some(id) => Some(self.directory.resolve_employee(db, id).await?),
            None => self.directory.find_by_user(db, &viewer.user_id).await?,
        };
        let reports = self
            .directory
            .list_direct_reports(db, &viewer.user_id)
            .await?;

        let mode = if reports.is_empty() {
            ScopeMode::Individual
        } else {
            ScopeMode::Manager
        };

        let viewer_employee_id = own.as_ref().map(|e| e.id.clone());
        let mut employees: Vec<EmployeeRef> = own.into_iter().collect();
        let own_id = viewer_employee_id.clone();
        employees.extend(
            reports
                .into_iter()
                .filter(|r| Some(&r.id) != own_id.as_ref()),
        );

        Ok(ResolvedScope {
            mode,
            viewer_employee_id,
            employees,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::viewer::ViewerRole;
    use crate::repositories::directory::MockOrganizationDirectoryTrait;
    use chrono::Utc;

    fn test_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost/unused").unwrap()
    }

    fn employee(id: &str, employment_status: &str) -> EmployeeRef {
        let now = Utc::now();
        EmployeeRef {
            id: id.to_string(),
            user_id: format!("user-{}", id),
            tenant_id: "tenant-1".to_string(),
            reporting_to: None,
            display_name: format!("Employee {}", id),
            employment_status: employment_status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn admin_scope_spans_the_tenant_including_former_employees() {
        let mut directory = MockOrganizationDirectoryTrait::new();
        directory
            .expect_list_tenant_employees()
            .withf(|_, tenant| tenant == "tenant-1")
            .returning(|_, _| {
                Ok(vec![
                    employee("emp-1", "active"),
                    employee("emp-2", "terminated"),
                ])
            });

        let resolver = VisibilityResolver::new(Arc::new(directory));
        let viewer = AuthUser {
            user_id: "user-9".to_string(),
            employee_id: None,
            role: ViewerRole::Admin,
            tenant_id: Some("tenant-1".to_string()),
        };
        let scope = resolver.resolve(&test_pool(), &viewer).await.unwrap();

        assert_eq!(scope.mode, ScopeMode::Admin);
        assert_eq!(
            scope.employee_ids(),
            vec!["emp-1".to_string(), "emp-2".to_string()]
        );
    }
}
