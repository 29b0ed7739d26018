use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;

// --- Request and Response Models ---

/// Body of `POST /agent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    /// The user's message. Required.
    pub input: Option<String>,
    /// Optional wallet key, applied to the session before the message runs.
    pub private_key: Option<String>,
    /// Optional session id; requests without one share the default session.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub response: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// --- Handlers ---

/// Runs one agent request and returns the final text.
pub async fn agent_handler(
    State(state): State<AppState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let input = match request.input.as_deref().map(str::trim) {
        Some(input) if !input.is_empty() => input.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, "Input is required"),
    };

    let private_key = request
        .private_key
        .filter(|k| !k.trim().is_empty())
        .map(SecretString::new);
    let session = state
        .sessions
        .get_or_create(request.session_id.as_deref())
        .await;
    info!(
        "Agent request in session {} (wallet key supplied: {})",
        session.id,
        private_key.is_some()
    );

    match state.agent.run(&session, &input, private_key).await {
        Ok(response) => (StatusCode::OK, Json(AgentResponse { response })).into_response(),
        Err(e) => {
            error!("Agent handler error: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", e),
            )
        }
    }
}
