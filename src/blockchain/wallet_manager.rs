//! Session wallet holder.
//!
//! Holds at most one signing credential in memory. Nothing here is ever
//! written to disk, and only the address is ever logged.

use std::fmt;
use std::str::FromStr;

use ethers_core::types::Address;
use ethers_signers::{LocalWallet, Signer};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::info;

use crate::blockchain::models::ChainError;
use crate::utils;

/// A signing credential: address plus private key material.
#[derive(Clone)]
pub struct SessionWallet {
    signer: LocalWallet,
}

impl SessionWallet {
    /// Builds a wallet from a hex private key (with or without `0x`).
    pub fn from_private_key(private_key: &SecretString) -> Result<Self, ChainError> {
        let key = private_key.expose_secret().trim();
        let signer = LocalWallet::from_str(key).map_err(|_| ChainError::InvalidPrivateKey)?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-55 address string.
    pub fn address_string(&self) -> String {
        utils::checksum(&self.address())
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }

    /// EIP-191 personal-message signature, 0x-prefixed hex.
    pub async fn sign_message(&self, message: &str) -> Result<String, ChainError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| ChainError::Signer(e.to_string()))?;
        Ok(format!("0x{}", signature))
    }
}

impl fmt::Debug for SessionWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionWallet")
            .field("address", &self.address_string())
            .finish_non_exhaustive()
    }
}

/// Slot holding the current session wallet. Last write wins.
#[derive(Debug, Default)]
pub struct WalletSlot {
    current: Mutex<Option<SessionWallet>>,
}

impl WalletSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing credential.
    pub async fn set(&self, wallet: SessionWallet) {
        info!("Wallet set to address: {}", wallet.address_string());
        *self.current.lock().await = Some(wallet);
    }

    pub async fn get(&self) -> Option<SessionWallet> {
        self.current.lock().await.clone()
    }

    /// Discards the credential. Returns whether one was present.
    pub async fn clear(&self) -> bool {
        let previous = self.current.lock().await.take();
        if previous.is_some() {
            info!("Wallet cleared from memory");
        }
        previous.is_some()
    }
}
