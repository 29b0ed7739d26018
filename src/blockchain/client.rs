//! Chain client contract.
//!
//! Command handlers talk to the network only through [`ChainClient`], which
//! keeps them independent of the transport and lets tests substitute an
//! in-memory chain. Every mutating call waits for the receipt before it
//! returns; a missing or failed receipt is an error, never a partial success.

use async_trait::async_trait;
use ethers::{
    abi::Token,
    signers::LocalWallet,
    types::{Address, Bytes, U256},
};

use crate::blockchain::models::{ChainError, LogEntry, TxOutcome};

pub use super::evm_client::EvmClient;

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance in wei.
    async fn get_balance(&self, address: Address) -> Result<U256, ChainError>;

    /// ERC-20 `balanceOf` in base units.
    async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// Current gas price in wei.
    async fn get_gas_price(&self) -> Result<U256, ChainError>;

    /// Next nonce for `address` as seen by the node.
    async fn get_transaction_count(&self, address: Address) -> Result<U256, ChainError>;

    async fn get_block_number(&self) -> Result<u64, ChainError>;

    async fn get_logs(
        &self,
        addresses: Vec<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError>;

    async fn send_native_transfer(
        &self,
        signer: &LocalWallet,
        to: Address,
        amount: U256,
        nonce: Option<U256>,
    ) -> Result<TxOutcome, ChainError>;

    async fn send_token_transfer(
        &self,
        signer: &LocalWallet,
        token: Address,
        to: Address,
        amount: U256,
        nonce: Option<U256>,
    ) -> Result<TxOutcome, ChainError>;

    /// Deploys `bytecode` with ABI-encoded `constructor_args` and returns the
    /// address of the new contract.
    async fn deploy_contract(
        &self,
        signer: &LocalWallet,
        bytecode: Bytes,
        constructor_args: Vec<Token>,
    ) -> Result<Address, ChainError>;
}
