use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims minted by the external identity service. The engine only decodes
/// them to establish the viewer; it never issues credentials of its own
/// outside of tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: String,
    pub tenant_id: Option<String>,
    pub employee_id: Option<String>,
    pub exp: i64, // expiration time
    pub iat: i64, // issued at
    pub jti: String, // JWT ID
}

impl Claims {
    pub fn new(
        user_id: String,
        role: String,
        tenant_id: Option<String>,
        employee_id: Option<String>,
        expiration_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: user_id,
            role,
            tenant_id,
            employee_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

pub fn create_access_token(claims: &Claims, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn verify_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_claims() {
        let claims = Claims::new(
            "user-1".to_string(),
            "admin".to_string(),
            Some("tenant-1".to_string()),
            Some("emp-1".to_string()),
            1,
        );
        let token = create_access_token(&claims, "secret").unwrap();
        let decoded = verify_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.tenant_id.as_deref(), Some("tenant-1"));
        assert_eq!(decoded.employee_id.as_deref(), Some("emp-1"));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let claims = Claims::new("user-1".to_string(), "employee".to_string(), None, None, 1);
        let token = create_access_token(&claims, "secret").unwrap();
        assert!(verify_access_token(&token, "other").is_err());
    }
}
