// src/blockchain/evm_client.rs

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{
    abi::Token,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Filter, TransactionReceipt,
        TransactionRequest, U256, U64,
    },
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::blockchain::{
    client::ChainClient,
    models::{ChainError, LogEntry, TxOutcome},
    services::token,
};
use crate::config::Config;

// Receipts are polled at this interval while waiting for a transaction to be mined.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn rpc_error(err: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc(err.to_string())
}

/// JSON-RPC client for the configured EVM network
#[derive(Clone)]
pub struct EvmClient {
    provider: Provider<Http>,
    chain_id: std::sync::Arc<OnceCell<u64>>,
    receipt_timeout: Duration,
}

impl EvmClient {
    /// Create a new EvmClient for the configured RPC URL. No network call is made here.
    pub fn new(config: &Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| anyhow!("Failed to create provider for {}: {}", config.rpc_url, e))?;

        Ok(Self {
            provider,
            chain_id: std::sync::Arc::new(OnceCell::new()),
            receipt_timeout: config.receipt_timeout,
        })
    }

    /// Chain id, fetched once from the node and cached for signing.
    async fn chain_id(&self) -> Result<u64, ChainError> {
        let id = self
            .chain_id
            .get_or_try_init(|| async {
                let id = self.provider.get_chainid().await.map_err(rpc_error)?;
                info!("Connected to chain id {}", id);
                Ok::<u64, ChainError>(id.as_u64())
            })
            .await?;
        Ok(*id)
    }

    /// Signs, submits and waits for `tx` to be mined.
    async fn submit(
        &self,
        signer: &LocalWallet,
        tx: TransactionRequest,
    ) -> Result<TransactionReceipt, ChainError> {
        let chain_id = self.chain_id().await?;
        let client = SignerMiddleware::new(
            self.provider.clone(),
            signer.clone().with_chain_id(chain_id),
        );

        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(rpc_error)?
            .interval(RECEIPT_POLL_INTERVAL);
        let hash = pending.tx_hash();
        debug!("Submitted transaction {:?}, waiting for receipt", hash);

        let receipt = match tokio::time::timeout(self.receipt_timeout, pending).await {
            Err(_) => {
                warn!("Timed out waiting for receipt of {:?}", hash);
                return Err(ChainError::ReceiptTimeout {
                    hash,
                    secs: self.receipt_timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                warn!("Receipt polling failed for {:?}: {}", hash, e);
                return Err(ChainError::MissingReceipt(hash));
            }
            Ok(Ok(None)) => return Err(ChainError::MissingReceipt(hash)),
            Ok(Ok(Some(receipt))) => receipt,
        };

        if receipt.status != Some(U64::one()) {
            return Err(ChainError::Reverted(hash));
        }
        Ok(receipt)
    }

    fn outcome(receipt: &TransactionReceipt) -> TxOutcome {
        TxOutcome {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        }
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(rpc_error)
    }

    async fn get_token_balance(&self, token_address: Address, owner: Address) -> Result<U256, ChainError> {
        let call: TypedTransaction = TransactionRequest::new()
            .to(token_address)
            .data(token::balance_of_call(owner))
            .into();
        let raw = self.provider.call(&call, None).await.map_err(rpc_error)?;
        token::decode_u256(&raw)
            .ok_or_else(|| ChainError::Rpc("malformed balanceOf response".to_string()))
    }

    async fn get_gas_price(&self) -> Result<U256, ChainError> {
        self.provider.get_gas_price().await.map_err(rpc_error)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(rpc_error)
    }

    async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(rpc_error)
    }

    async fn get_logs(
        &self,
        addresses: Vec<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError> {
        let filter = Filter::new()
            .address(addresses)
            .from_block(from_block)
            .to_block(to_block);
        let logs = self.provider.get_logs(&filter).await.map_err(rpc_error)?;

        Ok(logs
            .into_iter()
            .map(|log| LogEntry {
                transaction_hash: log.transaction_hash.map(|h| format!("{:?}", h)),
                block_number: log.block_number.map(|n| n.as_u64()),
                address: format!("{:?}", log.address),
                data: format!("0x{}", hex::encode(&log.data)),
            })
            .collect())
    }

    async fn send_native_transfer(
        &self,
        signer: &LocalWallet,
        to: Address,
        amount: U256,
        nonce: Option<U256>,
    ) -> Result<TxOutcome, ChainError> {
        let mut tx = TransactionRequest::new().to(to).value(amount);
        if let Some(nonce) = nonce {
            tx = tx.nonce(nonce);
        }
        let receipt = self.submit(signer, tx).await?;
        Ok(Self::outcome(&receipt))
    }

    async fn send_token_transfer(
        &self,
        signer: &LocalWallet,
        token_address: Address,
        to: Address,
        amount: U256,
        nonce: Option<U256>,
    ) -> Result<TxOutcome, ChainError> {
        let mut tx = token::transfer_tx(token_address, to, amount);
        if let Some(nonce) = nonce {
            tx = tx.nonce(nonce);
        }
        let receipt = self.submit(signer, tx).await?;
        Ok(Self::outcome(&receipt))
    }

    async fn deploy_contract(
        &self,
        signer: &LocalWallet,
        bytecode: Bytes,
        constructor_args: Vec<Token>,
    ) -> Result<Address, ChainError> {
        let tx = TransactionRequest::new().data(token::deployment_data(&bytecode, &constructor_args));
        let receipt = self.submit(signer, tx).await?;
        receipt
            .contract_address
            .ok_or(ChainError::MissingContractAddress(receipt.transaction_hash))
    }
}
