//! # API Module
//!
//! HTTP boundary of the agent.
//!
//! ## Endpoints
//! - `GET /` - welcome message
//! - `GET /health` - liveness plus a little runtime info
//! - `GET /chat` - browser chat client
//! - `POST /agent`, `POST /api/agent` - run one agent request

pub mod agent;
pub mod chat;
pub mod health;

use std::any::Any;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::AppState;

/// Builds the application router with tracing, CORS and panic isolation.
pub fn router(state: AppState) -> Router {
    let cors_origin = state.config.cors_origin.clone();

    let routes = Router::new()
        .route("/", get(health::welcome_handler))
        .route("/health", get(health::health_handler))
        .route("/chat", get(chat::chat_page_handler))
        .route("/agent", post(agent::agent_handler))
        .route("/api/agent", post(agent::agent_handler))
        .with_state(state);
    with_layers(routes, cors_origin.as_deref())
}

fn with_layers(routes: Router, cors_origin: Option<&str>) -> Router {
    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
}

/// A panicking request gets the same JSON error shape as any other 5xx.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);
    agent::error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error: request panicked",
    )
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };
    match HeaderValue::from_str(origin.trim_end_matches('/')) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        Err(e) => {
            warn!("Ignoring invalid CORS_ORIGIN {:?}: {}", origin, e);
            CorsLayer::permissive()
        }
    }
}
