use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use workforce_backend::{
    config::Config,
    db::connection::{create_pool, DbPool},
    docs::ApiDoc,
    handlers,
    middleware as auth_middleware,
    repositories::{AttendanceRepository, OrganizationDirectory, RequestRepository},
    services::{AttendanceTracker, PayrollProjection, RequestWorkflow},
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workforce_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        time_zone = %config.time_zone,
        non_working_weekday = ?config.workday.non_working_weekday,
        "Loaded configuration from environment/.env"
    );

    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let attendance_repo = Arc::new(AttendanceRepository::new());
    let request_repo = Arc::new(RequestRepository::new());
    let directory = Arc::new(OrganizationDirectory::new());

    let tracker = Arc::new(AttendanceTracker::new(
        pool.clone(),
        attendance_repo,
        directory.clone(),
        config.time_zone,
        config.workday,
    ));
    let workflow = Arc::new(RequestWorkflow::new(
        pool.clone(),
        request_repo.clone(),
        directory,
        tracker.clone(),
        config.time_zone,
        config.workday,
    ));
    let payroll = Arc::new(PayrollProjection::new(pool.clone(), request_repo));

    let state = AppState::new(pool, config.clone(), tracker, workflow, payroll);

    let user_routes = Router::new()
        .route(
            "/api/attendance/check-in",
            post(handlers::attendance::check_in),
        )
        .route(
            "/api/attendance/check-out",
            post(handlers::attendance::check_out),
        )
        .route("/api/attendance/today", get(handlers::attendance::today))
        .route(
            "/api/attendance/me",
            get(handlers::attendance::my_attendance),
        )
        .route(
            "/api/attendance/overview",
            get(handlers::attendance::overview),
        )
        .route(
            "/api/requests",
            post(handlers::requests::create).get(handlers::requests::list),
        )
        .route(
            "/api/requests/{id}",
            get(handlers::requests::detail)
                .put(handlers::requests::update)
                .delete(handlers::requests::remove),
        )
        .route(
            "/api/requests/{id}/status",
            put(handlers::requests::change_status),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            config.clone(),
            auth_middleware::auth,
        ));

    let admin_routes = Router::new()
        .route(
            "/api/admin/attendance",
            post(handlers::attendance::admin_create),
        )
        .route(
            "/api/admin/attendance/{id}",
            put(handlers::attendance::admin_update)
                .delete(handlers::attendance::admin_delete),
        )
        .route(
            "/api/admin/attendance/auto-checkout",
            post(handlers::attendance::run_auto_checkout),
        )
        .route(
            "/api/admin/payroll/overtime/{employee_id}",
            get(handlers::payroll::overtime_hours),
        )
        .route(
            "/api/admin/payroll/loans/{employee_id}",
            get(handlers::payroll::loans),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            config.clone(),
            auth_middleware::auth_admin,
        ));

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(user_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
