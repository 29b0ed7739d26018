// src/blockchain/models.rs
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use thiserror::Error;

// --- Error types for chain operations ---

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("signing failed: {0}")]
    Signer(String),
    #[error("transaction {hash:?} was not mined within {secs}s")]
    ReceiptTimeout { hash: H256, secs: u64 },
    #[error("no receipt returned for transaction {0:?}")]
    MissingReceipt(H256),
    #[error("transaction {0:?} reverted")]
    Reverted(H256),
    #[error("deployment {0:?} produced no contract address")]
    MissingContractAddress(H256),
}

impl ChainError {
    /// True when the transaction reached the network, so its nonce is spent
    /// even though the call as a whole failed.
    pub fn nonce_consumed(&self) -> bool {
        matches!(
            self,
            ChainError::ReceiptTimeout { .. }
                | ChainError::MissingReceipt(_)
                | ChainError::Reverted(_)
                | ChainError::MissingContractAddress(_)
        )
    }
}

// --- Transaction Models ---

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
}

impl TxOutcome {
    pub fn hash_hex(&self) -> String {
        format!("{:?}", self.tx_hash)
    }

    pub fn block_label(&self) -> String {
        match self.block_number {
            Some(block) => format!("block {}", block),
            None => "an unknown block".to_string(),
        }
    }
}

/// A log entry returned by the history query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub transaction_hash: Option<String>,
    pub block_number: Option<u64>,
    pub address: String,
    pub data: String,
}

// --- Transfer Models ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferKind {
    Native,
    Token { symbol: String, contract: Address },
}

/// One validated entry of a batch transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInstruction {
    pub kind: TransferKind,
    pub to: Address,
    /// Amount exactly as the user wrote it, used in reports.
    pub amount_display: String,
    /// Amount in base units (18 decimals).
    pub amount: U256,
}

impl TransferInstruction {
    pub fn unit_label<'a>(&'a self, native_symbol: &'a str) -> &'a str {
        match &self.kind {
            TransferKind::Native => native_symbol,
            TransferKind::Token { symbol, .. } => symbol,
        }
    }
}
