// src/lib.rs

use std::sync::Arc;

pub mod agent;
pub mod api;
pub mod blockchain;
pub mod config;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Runs agent requests against the chain and the planner
    pub agent: Arc<agent::Agent>,
    /// Live sessions (wallet slot + token registry per session id)
    pub sessions: agent::SessionStore,
}

impl AppState {
    pub fn new(config: config::Config, agent: agent::Agent) -> Self {
        let sessions = agent::SessionStore::new(config.session_idle_timeout, config.max_sessions);
        Self {
            config,
            agent: Arc::new(agent),
            sessions,
        }
    }
}
