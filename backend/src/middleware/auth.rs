use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{config::Config, models::viewer::AuthUser, utils::jwt::verify_access_token};

/// Decodes the bearer token and attaches the authenticated viewer to the
/// request. Identity itself is asserted by the external identity service that
/// minted the token; this layer only verifies and unpacks it.
pub async fn auth(
    State(config): State<Config>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let viewer = authenticate_request(request.headers(), &config)?;
    request.extensions_mut().insert(viewer);
    Ok(next.run(request).await)
}

/// Auth plus an admin-role gate for admin-only routes.
pub async fn auth_admin(
    State(config): State<Config>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let viewer = authenticate_request(request.headers(), &config)?;
    if !viewer.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(viewer);
    Ok(next.run(request).await)
}

fn authenticate_request(
    headers: &axum::http::HeaderMap,
    config: &Config,
) -> Result<AuthUser, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims =
        verify_access_token(token, &config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;
    AuthUser::from_claims(&claims).ok_or(StatusCode::UNAUTHORIZED)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}
