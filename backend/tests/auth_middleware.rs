use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower::ServiceExt;

use workforce_backend::{
    config::{Config, WorkdayRules},
    middleware as auth_middleware,
    utils::jwt::{create_access_token, Claims},
};

const SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        jwt_secret: SECRET.to_string(),
        jwt_expiration_hours: 1,
        time_zone: chrono_tz::UTC,
        workday: WorkdayRules::default(),
    }
}

fn user_app() -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route_layer(axum_middleware::from_fn_with_state(
            test_config(),
            auth_middleware::auth,
        ))
}

fn admin_app() -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route_layer(axum_middleware::from_fn_with_state(
            test_config(),
            auth_middleware::auth_admin,
        ))
}

fn token_for(role: &str) -> String {
    let claims = Claims::new(
        "user-1".to_string(),
        role.to_string(),
        Some("tenant-1".to_string()),
        Some("emp-1".to_string()),
        1,
    );
    create_access_token(&claims, SECRET).unwrap()
}

fn request_with_token(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/ping");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = user_app().oneshot(request_with_token(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let response = user_app()
        .oneshot(request_with_token(Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_passes_user_layer() {
    let token = token_for("employee");
    let response = user_app()
        .oneshot(request_with_token(Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_role_is_unauthorized() {
    let token = token_for("contractor");
    let response = user_app()
        .oneshot(request_with_token(Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn employee_token_is_forbidden_on_admin_layer() {
    let token = token_for("employee");
    let response = admin_app()
        .oneshot(request_with_token(Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_token_passes_admin_layer() {
    let token = token_for("admin");
    let response = admin_app()
        .oneshot(request_with_token(Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
