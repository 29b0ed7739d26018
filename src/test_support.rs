//! In-memory stand-ins for the chain and the planner, used by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, H256, U256};
use secrecy::SecretString;

use crate::agent::planner::{Decision, Planner, PlannerError};
use crate::agent::protocol::Message;
use crate::agent::tools::ToolSpec;
use crate::blockchain::client::ChainClient;
use crate::blockchain::models::{ChainError, LogEntry, TxOutcome};
use crate::blockchain::wallet_manager::SessionWallet;

// Well-known development key (anvil/hardhat account #0).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub fn dev_wallet() -> SessionWallet {
    SessionWallet::from_private_key(&SecretString::new(DEV_KEY.to_string())).unwrap()
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    token_balances: HashMap<(Address, Address), U256>,
    failing_tokens: HashSet<Address>,
    rpc_failure: Option<String>,
    gas_price: U256,
    block_number: u64,
    logs: Vec<LogEntry>,
    last_log_range: Option<(u64, u64)>,
    tx_counts: HashMap<Address, U256>,
    native_failures: HashMap<Address, String>,
    sent_nonces: Vec<Option<U256>>,
    token_transfers: Vec<(Address, U256)>,
    deploy_address: Address,
    deployments: usize,
    next_tx: u64,
}

/// Scriptable chain. Every submission attempt is recorded, including ones
/// that fail.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut *state)
    }

    fn check(&self) -> Result<(), ChainError> {
        match self.with(|s| s.rpc_failure.clone()) {
            Some(message) => Err(ChainError::Rpc(message)),
            None => Ok(()),
        }
    }

    pub fn set_balance(&self, address: Address, amount: U256) {
        self.with(|s| s.balances.insert(address, amount));
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.with(|s| s.token_balances.insert((token, owner), amount));
    }

    pub fn fail_token_balance(&self, token: Address) {
        self.with(|s| s.failing_tokens.insert(token));
    }

    /// Makes every call fail with an RPC error.
    pub fn fail_rpc(&self, message: &str) {
        self.with(|s| s.rpc_failure = Some(message.to_string()));
    }

    pub fn set_gas_price(&self, price: U256) {
        self.with(|s| s.gas_price = price);
    }

    pub fn set_block_number(&self, block: u64) {
        self.with(|s| s.block_number = block);
    }

    pub fn set_logs(&self, logs: Vec<LogEntry>) {
        self.with(|s| s.logs = logs);
    }

    pub fn last_log_range(&self) -> Option<(u64, u64)> {
        self.with(|s| s.last_log_range)
    }

    pub fn set_transaction_count(&self, address: Address, count: U256) {
        self.with(|s| s.tx_counts.insert(address, count));
    }

    /// Native transfers to `to` are rejected by the "node".
    pub fn fail_native_send_to(&self, to: Address, message: &str) {
        self.with(|s| s.native_failures.insert(to, message.to_string()));
    }

    pub fn sent_nonces(&self) -> Vec<Option<U256>> {
        self.with(|s| s.sent_nonces.clone())
    }

    pub fn token_transfers(&self) -> Vec<(Address, U256)> {
        self.with(|s| s.token_transfers.clone())
    }

    pub fn set_deploy_address(&self, address: Address) {
        self.with(|s| s.deploy_address = address);
    }

    pub fn deployments(&self) -> usize {
        self.with(|s| s.deployments)
    }

    fn mined(&self) -> TxOutcome {
        self.with(|s| {
            s.next_tx += 1;
            TxOutcome {
                tx_hash: H256::from_low_u64_be(s.next_tx),
                block_number: Some(s.block_number),
            }
        })
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        self.check()?;
        Ok(self.with(|s| s.balances.get(&address).copied().unwrap_or_default()))
    }

    async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.check()?;
        if self.with(|s| s.failing_tokens.contains(&token)) {
            return Err(ChainError::Rpc("execution reverted".to_string()));
        }
        Ok(self.with(|s| s.token_balances.get(&(token, owner)).copied().unwrap_or_default()))
    }

    async fn get_gas_price(&self) -> Result<U256, ChainError> {
        self.check()?;
        Ok(self.with(|s| s.gas_price))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256, ChainError> {
        self.check()?;
        Ok(self.with(|s| s.tx_counts.get(&address).copied().unwrap_or_default()))
    }

    async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.check()?;
        Ok(self.with(|s| s.block_number))
    }

    async fn get_logs(
        &self,
        _addresses: Vec<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError> {
        self.check()?;
        Ok(self.with(|s| {
            s.last_log_range = Some((from_block, to_block));
            s.logs.clone()
        }))
    }

    async fn send_native_transfer(
        &self,
        _signer: &LocalWallet,
        to: Address,
        _amount: U256,
        nonce: Option<U256>,
    ) -> Result<TxOutcome, ChainError> {
        let rejection = self.with(|s| {
            s.sent_nonces.push(nonce);
            s.native_failures.get(&to).cloned()
        });
        self.check()?;
        if let Some(message) = rejection {
            return Err(ChainError::Rpc(message));
        }
        Ok(self.mined())
    }

    async fn send_token_transfer(
        &self,
        _signer: &LocalWallet,
        token: Address,
        _to: Address,
        amount: U256,
        nonce: Option<U256>,
    ) -> Result<TxOutcome, ChainError> {
        self.with(|s| s.sent_nonces.push(nonce));
        self.check()?;
        self.with(|s| s.token_transfers.push((token, amount)));
        Ok(self.mined())
    }

    async fn deploy_contract(
        &self,
        _signer: &LocalWallet,
        _bytecode: Bytes,
        _constructor_args: Vec<Token>,
    ) -> Result<Address, ChainError> {
        self.check()?;
        Ok(self.with(|s| {
            s.deployments += 1;
            s.deploy_address
        }))
    }
}

/// Planner that replays a fixed list of decisions and records what it saw.
#[derive(Default)]
pub struct ScriptedPlanner {
    script: Mutex<VecDeque<Decision>>,
    failure: Option<String>,
    calls: AtomicUsize,
    last: Mutex<Vec<Message>>,
}

impl ScriptedPlanner {
    pub fn new(script: Vec<Decision>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Every call fails as an upstream 503.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conversation(&self) -> Vec<Message> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, conversation: &[Message], _catalog: &[ToolSpec]) -> Result<Decision, PlannerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = conversation.to_vec();
        if let Some(message) = &self.failure {
            return Err(PlannerError::Api {
                status: 503,
                body: message.clone(),
            });
        }
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Decision::Final("(script exhausted)".to_string())))
    }
}
