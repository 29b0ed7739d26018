// src/blockchain/nonce_manager.rs

use ethers_core::types::{Address, U256};
use tracing::debug;

use crate::blockchain::{client::ChainClient, models::ChainError};

/// Local nonce cursor for submitting several transactions back to back.
///
/// The nonce is read from the node once; afterwards it only moves forward
/// locally. This assumes nothing else submits transactions from the same
/// address while the cursor is in use.
#[derive(Debug)]
pub struct NonceTracker {
    address: Address,
    next_nonce: U256,
}

impl NonceTracker {
    /// Fetches the starting nonce for `address` from the chain.
    pub async fn fetch(chain: &dyn ChainClient, address: Address) -> Result<Self, ChainError> {
        let next_nonce = chain.get_transaction_count(address).await?;
        debug!("Starting nonce for {:?} is {}", address, next_nonce);
        Ok(Self { address, next_nonce })
    }

    /// Nonce the next submission should use.
    pub fn current(&self) -> U256 {
        self.next_nonce
    }

    /// Marks the current nonce as spent.
    pub fn advance(&mut self) {
        self.next_nonce += U256::one();
        debug!("Next nonce for {:?} is {}", self.address, self.next_nonce);
    }
}
