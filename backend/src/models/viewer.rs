use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::jwt::Claims;

/// The authenticated viewer extracted from token claims. Role and tenant
/// association are asserted by the external identity service; visibility is
/// resolved from them by `VisibilityResolver`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: String,
    pub employee_id: Option<String>,
    pub role: ViewerRole,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Employee,
    Manager,
    Admin,
}

impl ViewerRole {
    pub fn parse(value: &str) -> Option<ViewerRole> {
        match value.to_ascii_lowercase().as_str() {
            "employee" => Some(ViewerRole::Employee),
            "manager" => Some(ViewerRole::Manager),
            "admin" | "company_admin" => Some(ViewerRole::Admin),
            _ => None,
        }
    }
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.sub.clone(),
            employee_id: claims.employee_id.clone(),
            role: ViewerRole::parse(&claims.role)?,
            tenant_id: claims.tenant_id.clone(),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == ViewerRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_tolerates_legacy_values() {
        assert_eq!(ViewerRole::parse("Admin"), Some(ViewerRole::Admin));
        assert_eq!(ViewerRole::parse("company_admin"), Some(ViewerRole::Admin));
        assert_eq!(ViewerRole::parse("manager"), Some(ViewerRole::Manager));
        assert_eq!(ViewerRole::parse("contractor"), None);
    }
}
