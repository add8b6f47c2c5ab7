use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rollcall_backend::{
    config::Config,
    db::connection::create_pool,
    docs,
    handlers,
    middleware::{auth, logging, rate_limit, request_id},
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
                .unwrap_or_else(|_| "rollcall_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        token_ttl_minutes = config.token_ttl_minutes,
        grace_period_minutes = config.grace_period_minutes,
        time_zone = %config.time_zone,
        "Loaded configuration from environment/.env"
    );

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let bind_addr = config.bind_addr.clone();
    let scan_limiter = rate_limit::create_scan_rate_limiter(&config);
    let state = AppState::new(pool, config);

    // Status is readable by anyone who is signed in.
    let shared_routes = Router::new()
        .route(
            "/api/sessions/{id}/status",
            get(handlers::sessions::get_session_status),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth,
        ));

    let lecturer_routes = Router::new()
        .route(
            "/api/sessions/{id}/token",
            post(handlers::sessions::issue_token),
        )
        .route(
            "/api/sessions/{id}/attendance",
            get(handlers::sessions::get_session_attendance),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_lecturer,
        ));

    let student_routes = Router::new()
        .route(
            "/api/sessions/scan",
            post(handlers::attendance::submit_scan).layer(scan_limiter),
        )
        .route(
            "/api/attendance/me",
            get(handlers::attendance::get_my_attendance),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_student,
        ));

    let app = Router::new()
        .merge(shared_routes)
        .merge(lecturer_routes)
        .merge(student_routes)
        .merge(
            SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", docs::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(request_id::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(logging::log_error_responses))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    tracing::info!("Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    // Connect info feeds the per-IP key extractor on the scan route.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
