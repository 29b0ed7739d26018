//! Chain-facing operations used by the command handlers.
//!
//! Each service takes a [`ChainClient`](crate::blockchain::client::ChainClient)
//! (or an HTTP client for off-chain data) and returns either a typed result
//! or ready-to-show text.

pub mod balance;
pub mod faucet;
pub mod fees;
pub mod history;
pub mod market;
pub mod token;
pub mod transactions;
