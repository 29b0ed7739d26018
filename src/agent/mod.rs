//! # Agent Module
//!
//! The conversational layer on top of the chain services.
//!
//! - `protocol` - conversation messages and tool calls
//! - `session` - per-session wallet slot and token registry
//! - `tools` - the command catalog and command parsing
//! - `handler` - command execution, always producing text
//! - `planner` - the decision step (`Planner` trait, OpenAI-backed implementation)
//! - `dispatcher` - the bounded decide/execute loop

pub mod dispatcher;
pub mod handler;
pub mod planner;
pub mod protocol;
pub mod session;
pub mod tools;

pub use dispatcher::{Agent, AgentError};
pub use session::{Session, SessionStore};
