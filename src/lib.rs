//! Bandipur House site backend - library for app logic and testing

pub mod backend;
pub mod config;
pub mod error;
pub mod forms;
pub mod gate;
pub mod image_upload;
pub mod logging;
pub mod manager;
pub mod media;
pub mod routes;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::manager::{clubs::Clubs, events::Events, team::Team};
use crate::routes::manage::resource_router;
use crate::state::AppState;

/// Request body cap: one 5 MB image plus the rest of the form.
const BODY_LIMIT: usize = 6 * 1024 * 1024;

/// CORS for the configured frontend origins. Credentials are allowed so the
/// session cookie travels with cross-origin calls.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);
    tracing::info!(origins = ?state.config.allowed_origins, "CORS configured");

    let admin = Router::new()
        .route("/", get(routes::dashboard::overview))
        .nest("/events", resource_router::<Events>())
        .nest("/clubs", resource_router::<Clubs>())
        .nest("/team", resource_router::<Team>())
        .nest("/admins", routes::admins::router());

    Router::new()
        .route("/api/site", get(routes::public::site))
        .route("/api/home", get(routes::public::home))
        .route("/api/events", get(routes::public::events))
        .route("/api/clubs", get(routes::public::clubs))
        .route("/api/team", get(routes::public::team))
        .route("/api/resources", get(routes::public::resources))
        .route("/api/contact", get(routes::public::contact))
        .route("/admin/login", get(routes::auth::login_page))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/reset-password", post(routes::auth::reset_password))
        .route("/api/auth/session", get(routes::auth::current_session))
        .route(
            "/api/upload",
            post(routes::upload::upload).delete(routes::upload::destroy),
        )
        .nest("/admin/dashboard", admin)
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors)
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("refusing to start in production: {0}")]
    Config(String),

    #[error("invalid HOST/PORT configuration: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // dropping the guards stops the log writer threads
    let _log_guards = logging::init(&config);

    routes::health::init_start_time();

    let problems = config.production_problems();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("{}", problem);
        }
        return Err(StartupError::Config(problems.join("; ")));
    }

    let addr: SocketAddr = config.bind_addr()?;
    let state = AppState::from_config(config)?;
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
