//! Per-session state: the wallet slot and the token registry.
//!
//! Requests that carry the same session id share one [`Session`]; requests
//! without an id use the shared default session. Sessions idle for longer
//! than the configured timeout are evicted along with their wallet, and the
//! store never holds more than `max_sessions` entries.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ethers::types::Address;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::blockchain::wallet_manager::WalletSlot;

pub const DEFAULT_SESSION_ID: &str = "default";

/// Symbol → deployed contract address. Symbols are case-sensitive and entries
/// are never removed.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: DashMap<String, Address>,
}

impl TokenRegistry {
    pub fn lookup(&self, symbol: &str) -> Option<Address> {
        self.tokens.get(symbol).map(|entry| *entry.value())
    }

    /// Records a new symbol. Returns `false` and keeps the existing entry if
    /// the symbol is already registered.
    pub fn register(&self, symbol: &str, address: Address) -> bool {
        match self.tokens.entry(symbol.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(address);
                true
            }
        }
    }

    /// All entries, sorted by symbol.
    pub fn entries(&self) -> Vec<(String, Address)> {
        let mut entries: Vec<(String, Address)> = self
            .tokens
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub wallet: WalletSlot,
    pub tokens: TokenRegistry,
    last_used: Mutex<Instant>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            wallet: WalletSlot::new(),
            tokens: TokenRegistry::default(),
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn last_used(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used())
    }
}

/// Process-wide map of live sessions. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Arc<Session>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session for `id`, creating it on first use. Blank or
    /// missing ids map to the default session. Creating a session when the
    /// store is full evicts the least recently used one first.
    pub async fn get_or_create(&self, id: Option<&str>) -> Arc<Session> {
        let id = id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID);

        let existing = self.sessions.get(id).map(|entry| entry.value().clone());
        if let Some(session) = existing {
            session.touch();
            return session;
        }

        if self.sessions.len() >= self.max_sessions {
            if let Some(oldest) = self.remove_least_recent() {
                info!("Session limit {} reached; evicting {}", self.max_sessions, oldest.id);
                discard(oldest).await;
            }
        }

        let session = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Creating session {}", id);
                Arc::new(Session::new(id))
            })
            .clone();
        session.touch();
        session
    }

    fn remove_least_recent(&self) -> Option<Arc<Session>> {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_used())
            .map(|entry| entry.key().clone())?;
        self.sessions.remove(&oldest).map(|(_, session)| session)
    }

    /// Removes every session idle for at least the idle timeout and clears
    /// its wallet. Returns how many were evicted.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for(now) >= self.idle_timeout)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for id in expired {
            // A request may have touched the session since the scan.
            let removed = self
                .sessions
                .remove_if(&id, |_, session| session.idle_for(now) >= self.idle_timeout);
            if let Some((_, session)) = removed {
                discard(session).await;
                evicted += 1;
            }
        }
        evicted
    }

    /// Runs [`evict_idle`](Self::evict_idle) every `every` until the runtime
    /// shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle().await;
                if evicted > 0 {
                    info!("Evicted {} idle session(s); {} live", evicted, store.len());
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Drops the wallet of a session that left the store. In-flight requests
/// still holding the session see it disconnected.
async fn discard(session: Arc<Session>) {
    session.wallet.clear().await;
    debug!("Session {} discarded", session.id);
}
