use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Employee identity as resolved from the organization directory. The
/// directory subsystem owns this data; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmployeeRef {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub reporting_to: Option<String>,
    pub display_name: String,
    pub employment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeRef {
    pub fn is_active(&self) -> bool {
        self.employment_status.eq_ignore_ascii_case("active")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_active_ignores_case() {
        let now = Utc::now();
        let mut employee = EmployeeRef {
            id: "emp-1".to_string(),
            user_id: "user-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            reporting_to: None,
            display_name: "A Person".to_string(),
            employment_status: "Active".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert!(employee.is_active());
        employee.employment_status = "terminated".to_string();
        assert!(!employee.is_active());
    }
}
