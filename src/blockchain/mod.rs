// src/blockchain/mod.rs

// Chain access: the client contract and its ethers-backed implementation
pub mod client;
pub mod evm_client;
pub use client::{ChainClient, EvmClient};

pub mod models;
pub mod nonce_manager;
pub mod services;
pub mod wallet_manager;
