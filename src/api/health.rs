use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the EVM chat agent! Use POST /agent to interact with the agent, or open /chat in a browser.";

pub async fn welcome_handler() -> impl IntoResponse {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "network": state.config.network_name,
        "modelConfigured": state.agent.has_planner(),
        "sessions": state.sessions.len(),
    }))
}
