// src/blockchain/services/faucet.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::Config;

#[derive(Deserialize)]
struct FaucetResponse {
    #[serde(rename = "txHash")]
    tx_hash: String,
}

/// Manual faucet steps, used when no faucet API is configured.
pub fn faucet_instructions(config: &Config, address: &str) -> String {
    format!(
        "To get testnet {sym} tokens for {addr}, visit {url}, connect your wallet, paste your address ({addr}), and click 'Get Testnet {sym}'. Tokens are available every 12 hours based on eligibility (e.g., Discord role or ETH activity).",
        sym = config.native_symbol,
        addr = address,
        url = config.faucet_url,
    )
}

/// Requests faucet tokens through the configured faucet API and returns the
/// funding transaction hash.
pub async fn request_faucet_tokens(
    client: &Client,
    faucet_api_url: &str,
    network_name: &str,
    recipient_address: &str,
) -> Result<String> {
    info!("Requesting faucet via API for {} on {}", recipient_address, network_name);

    let url = format!("{}/faucet/request", faucet_api_url.trim_end_matches('/'));

    let resp = client
        .post(&url)
        .json(&json!({
            "address": recipient_address,
            "chain": network_name,
        }))
        .send()
        .await
        .context("Failed to call faucet API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("Faucet API error: status={} body={}", status, text);
    }

    let parsed: FaucetResponse = resp.json().await.context("Invalid faucet API response")?;
    Ok(parsed.tx_hash)
}
