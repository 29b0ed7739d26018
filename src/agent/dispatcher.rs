// src/agent/dispatcher.rs

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::agent::{
    handler::{execute, ToolContext},
    planner::{Decision, Planner, PlannerError},
    protocol::{Conversation, ToolCall},
    session::Session,
    tools::{catalog, Command, CommandKind, ToolSpec},
};
use crate::blockchain::{client::ChainClient, services::market::MarketClient};
use crate::config::Config;

pub const NO_MODEL_REPLY: &str = "Natural-language requests need a language model, but OPENAI_API_KEY is not configured. Use slash commands instead; type /help to list them.";

const PRESET_WALLET_CALL_ID: &str = "preset_wallet";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

/// Runs one request: decide, execute at most one command, repeat.
pub struct Agent {
    config: Config,
    chain: Arc<dyn ChainClient>,
    planner: Option<Arc<dyn Planner>>,
    market: MarketClient,
    catalog: Vec<ToolSpec>,
}

impl Agent {
    pub fn new(
        config: Config,
        chain: Arc<dyn ChainClient>,
        planner: Option<Arc<dyn Planner>>,
        market: MarketClient,
    ) -> Self {
        Self {
            config,
            chain,
            planner,
            market,
            catalog: catalog(),
        }
    }

    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    fn context<'a>(&'a self, session: &'a Session) -> ToolContext<'a> {
        ToolContext {
            chain: self.chain.as_ref(),
            session,
            market: &self.market,
            config: &self.config,
        }
    }

    /// Handles one user input. A `private_key` is applied to the session
    /// before anything else and never reaches the planner.
    pub async fn run(
        &self,
        session: &Session,
        input: &str,
        private_key: Option<SecretString>,
    ) -> Result<String, AgentError> {
        let ctx = self.context(session);
        let mut conversation = Conversation::new();

        if let Some(private_key) = private_key {
            let result = execute(Command::SetWallet { private_key }, &ctx).await;
            conversation.push_user("setWallet [private key provided with the request]");
            conversation.push_tool_request(ToolCall {
                id: PRESET_WALLET_CALL_ID.to_string(),
                name: CommandKind::SetWallet.name().to_string(),
                arguments: json!({ "privateKey": "[redacted]" }),
            });
            conversation.push_tool_result(PRESET_WALLET_CALL_ID, result);
        }

        let input = input.trim();
        if input.starts_with('/') {
            let reply = match Command::parse_slash(input) {
                Ok(command) => execute(command, &ctx).await,
                Err(message) => message,
            };
            return Ok(reply);
        }

        let Some(planner) = self.planner.as_deref() else {
            return Ok(NO_MODEL_REPLY.to_string());
        };

        conversation.push_user(input);
        self.drive(planner, &ctx, conversation).await
    }

    /// The Deciding/Executing loop, bounded by `max_agent_steps` decisions.
    async fn drive(
        &self,
        planner: &dyn Planner,
        ctx: &ToolContext<'_>,
        mut conversation: Conversation,
    ) -> Result<String, AgentError> {
        let max_steps = self.config.max_agent_steps;

        for step in 1..=max_steps {
            match planner.plan(conversation.messages(), &self.catalog).await? {
                Decision::Final(text) => {
                    info!(
                        "Agent finished after {} step(s) with {} message(s) in the conversation",
                        step,
                        conversation.messages().len()
                    );
                    return Ok(text);
                }
                Decision::Invoke(call) => {
                    info!("Step {}: model requested {}", step, call.name);
                    let output = match Command::from_call(&call.name, &call.arguments) {
                        Ok(command) => execute(command, ctx).await,
                        Err(message) => message,
                    };
                    let call_id = call.id.clone();
                    conversation.push_tool_request(call);
                    conversation.push_tool_result(call_id, output);
                }
            }
        }

        warn!("Agent stopped after reaching the {}-step limit", max_steps);
        Ok(format!(
            "Unable to complete the request within {} steps.",
            max_steps
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::protocol::Role;
    use crate::agent::tools::help_text;
    use crate::test_support::{MockChain, ScriptedPlanner, DEV_ADDRESS, DEV_KEY};

    fn invoke(name: &str, arguments: serde_json::Value) -> Decision {
        Decision::Invoke(ToolCall {
            id: format!("call_{}", name),
            name: name.to_string(),
            arguments,
        })
    }

    fn agent(planner: Option<Arc<ScriptedPlanner>>) -> Agent {
        let config = Config::default();
        let market = MarketClient::new(&config).unwrap();
        Agent::new(
            config,
            Arc::new(MockChain::new()),
            planner.map(|p| p as Arc<dyn Planner>),
            market,
        )
    }

    #[tokio::test]
    async fn loop_stops_at_first_plain_text_reply() {
        let planner = Arc::new(ScriptedPlanner::new(vec![
            invoke("help", json!({})),
            invoke("getGasPrice", json!({})),
            Decision::Final("All done.".into()),
            Decision::Final("never reached".into()),
        ]));
        let agent = agent(Some(planner.clone()));
        let session = Session::new("s");

        let reply = agent.run(&session, "what can you do?", None).await.unwrap();

        assert_eq!(reply, "All done.");
        assert_eq!(planner.calls(), 3);
        let last = planner.last_conversation();
        let roles: Vec<Role> = last.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant, Role::Tool]
        );
        assert_eq!(last[2].content, help_text());
    }

    #[tokio::test]
    async fn step_limit_ends_a_runaway_loop() {
        let script = (0..20).map(|_| invoke("help", json!({}))).collect();
        let planner = Arc::new(ScriptedPlanner::new(script));
        let agent = agent(Some(planner.clone()));

        let reply = agent.run(&Session::new("s"), "loop forever", None).await.unwrap();

        assert_eq!(reply, "Unable to complete the request within 8 steps.");
        assert_eq!(planner.calls(), 8);
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_are_fed_back_as_text() {
        let planner = Arc::new(ScriptedPlanner::new(vec![
            invoke("launchRocket", json!({})),
            invoke("transferTokens", json!({"to": "0xabc"})),
            Decision::Final("Sorry.".into()),
        ]));
        let agent = agent(Some(planner.clone()));

        agent.run(&Session::new("s"), "go", None).await.unwrap();

        let last = planner.last_conversation();
        assert_eq!(last[2].content, "Unknown command: launchRocket");
        assert_eq!(last[4].content, "Missing or invalid required argument: 'amount'");
    }

    #[tokio::test]
    async fn private_key_is_applied_but_never_shown_to_the_model() {
        let planner = Arc::new(ScriptedPlanner::new(vec![Decision::Final("ok".into())]));
        let agent = agent(Some(planner.clone()));
        let session = Session::new("s");

        agent
            .run(&session, "hi", Some(SecretString::new(DEV_KEY.to_string())))
            .await
            .unwrap();

        let wallet = session.wallet.get().await.unwrap();
        assert_eq!(wallet.address_string(), DEV_ADDRESS);

        let seen = planner.last_conversation();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[2].content, format!("Wallet set to address: {}", DEV_ADDRESS));
        assert_eq!(seen[3].content, "hi");
        let dump = serde_json::to_string(&seen).unwrap();
        assert!(!dump.contains(&DEV_KEY[2..]));
    }

    #[tokio::test]
    async fn slash_commands_skip_the_planner() {
        let planner = Arc::new(ScriptedPlanner::new(vec![]));
        let agent = agent(Some(planner.clone()));
        let session = Session::new("s");

        let reply = agent.run(&session, "/help", None).await.unwrap();
        assert_eq!(reply, help_text());

        let reply = agent
            .run(&session, "/address", Some(SecretString::new(DEV_KEY.to_string())))
            .await
            .unwrap();
        assert_eq!(reply, DEV_ADDRESS);
        assert_eq!(planner.calls(), 0);
    }

    #[tokio::test]
    async fn without_a_model_plain_text_gets_guidance() {
        let agent = agent(None);
        let reply = agent.run(&Session::new("s"), "what's my balance?", None).await.unwrap();
        assert_eq!(reply, NO_MODEL_REPLY);
        assert!(!agent.has_planner());
    }

    #[tokio::test]
    async fn planner_failures_surface_as_errors() {
        let planner = Arc::new(ScriptedPlanner::failing("upstream 503"));
        let agent = agent(Some(planner));
        let err = agent.run(&Session::new("s"), "hello", None).await.unwrap_err();
        assert!(err.to_string().contains("upstream 503"));
    }
}
