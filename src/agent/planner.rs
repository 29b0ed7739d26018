//! The decision step of the agent loop.
//!
//! A [`Planner`] looks at the conversation so far and the command catalog and
//! either asks for one command to run or produces the final answer. The loop
//! makes no assumption about how the decision is made.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::agent::protocol::{Message, Role, ToolCall};
use crate::agent::tools::ToolSpec;
use crate::config::Config;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run this command, then ask again.
    Invoke(ToolCall),
    /// No command requested; this is the reply.
    Final(String),
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, conversation: &[Message], catalog: &[ToolSpec]) -> Result<Decision, PlannerError>;
}

/// Planner backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiPlanner {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    system_prompt: String,
}

impl OpenAiPlanner {
    /// Returns `None` when no model key is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = config.openai_api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder().timeout(config.model_timeout).build()?;
        Ok(Some(Self {
            client,
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            api_key: SecretString::new(api_key),
            system_prompt: system_prompt(config),
        }))
    }
}

fn system_prompt(config: &Config) -> String {
    format!(
        "You are an AI assistant that helps users interact with the {network} blockchain. \
         Use the provided tools to assist the user. The native currency is {symbol}. \
         The wallet private key persists until the user explicitly disconnects. \
         Call at most one tool at a time.",
        network = config.network_name,
        symbol = config.native_symbol,
    )
}

/// Chat-completions request body for `conversation` with `catalog` as tools.
pub fn build_request_body(
    model: &str,
    system_prompt: &str,
    conversation: &[Message],
    catalog: &[ToolSpec],
) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
    messages.extend(conversation.iter().map(format_message));

    let tools: Vec<Value> = catalog
        .iter()
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.parameters,
                }
            })
        })
        .collect();

    json!({
        "model": model,
        "temperature": 0,
        "messages": messages,
        "tools": tools,
        "tool_choice": "auto",
    })
}

fn format_message(message: &Message) -> Value {
    match (message.role, &message.tool_call) {
        (Role::Assistant, Some(call)) => json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                }
            }]
        }),
        (Role::Tool, _) => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
        (Role::User, _) => json!({ "role": "user", "content": message.content }),
        (Role::Assistant, None) => json!({ "role": "assistant", "content": message.content }),
    }
}

/// Reads the first choice of a chat-completions response. Only the first
/// requested tool call is honoured; any others are logged and dropped.
pub fn parse_completion(body: &Value) -> Result<Decision, PlannerError> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| PlannerError::Malformed("no choices in response".to_string()))?;

    let calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if let Some(first) = calls.first() {
        if calls.len() > 1 {
            let dropped: Vec<&str> = calls[1..]
                .iter()
                .filter_map(|c| c.pointer("/function/name").and_then(Value::as_str))
                .collect();
            warn!("Model requested {} tool calls; dropping {:?}", calls.len(), dropped);
        }

        let name = first
            .pointer("/function/name")
            .and_then(Value::as_str)
            .ok_or_else(|| PlannerError::Malformed("tool call without a name".to_string()))?;
        let id = first
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
        let raw_args = first
            .pointer("/function/arguments")
            .and_then(Value::as_str)
            .unwrap_or("{}");
        let arguments = serde_json::from_str(raw_args).unwrap_or_else(|e| {
            warn!("Unparseable arguments for {}: {}", name, e);
            json!({})
        });

        return Ok(Decision::Invoke(ToolCall {
            id,
            name: name.to_string(),
            arguments,
        }));
    }

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(Decision::Final(content))
}

#[async_trait]
impl Planner for OpenAiPlanner {
    async fn plan(&self, conversation: &[Message], catalog: &[ToolSpec]) -> Result<Decision, PlannerError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = build_request_body(&self.model, &self.system_prompt, conversation, catalog);
        debug!(
            "Planning with {} message(s) and {} tool(s)",
            conversation.len(),
            catalog.len()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlannerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = resp.json().await?;
        parse_completion(&parsed)
    }
}
