use ethers::types::Address;
use serde::Serialize;
use tracing::info;

use crate::blockchain::{client::ChainClient, models::ChainError};
use crate::config::Config;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryItem {
    hash: String,
    block_number: Option<u64>,
    /// Contract or account that emitted the log.
    address: String,
    data: String,
}

/// Recent log entries emitted by `addresses` within the last
/// `history_block_window` blocks, newest block first, with explorer links.
pub async fn recent_activity(
    chain: &dyn ChainClient,
    config: &Config,
    addresses: Vec<Address>,
    count: usize,
) -> Result<String, ChainError> {
    let latest = chain.get_block_number().await?;
    let from_block = latest.saturating_sub(config.history_block_window.saturating_sub(1));

    info!(
        "Fetching logs for {} address(es) in blocks {}..={}",
        addresses.len(),
        from_block,
        latest
    );

    let mut logs = chain.get_logs(addresses, from_block, latest).await?;
    logs.sort_by(|a, b| b.block_number.cmp(&a.block_number));

    let items: Vec<HistoryItem> = logs
        .into_iter()
        .take(count)
        .map(|log| HistoryItem {
            hash: log
                .transaction_hash
                .map(|h| config.tx_url(&h))
                .unwrap_or_else(|| "pending".to_string()),
            block_number: log.block_number,
            address: log.address,
            data: log.data,
        })
        .collect();

    if items.is_empty() {
        return Ok(format!(
            "No transactions found in the last {} blocks.",
            config.history_block_window
        ));
    }

    let rendered = serde_json::to_string_pretty(&items)
        .map_err(|e| ChainError::Rpc(format!("failed to render history: {}", e)))?;
    Ok(format!("Recent {} transactions:\n{}", items.len(), rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::models::LogEntry;
    use crate::test_support::MockChain;

    fn entry(block: u64) -> LogEntry {
        LogEntry {
            transaction_hash: Some(format!("0x{:064x}", block)),
            block_number: Some(block),
            address: "0x0000000000000000000000000000000000000001".into(),
            data: "0x".into(),
        }
    }

    #[tokio::test]
    async fn scans_the_configured_window_and_limits_count() {
        let chain = MockChain::new();
        chain.set_block_number(1_000);
        chain.set_logs(vec![entry(950), entry(990), entry(970)]);
        let config = Config::default();

        let report = recent_activity(&chain, &config, vec![Address::repeat_byte(1)], 2)
            .await
            .unwrap();

        assert_eq!(chain.last_log_range(), Some((901, 1_000)));
        assert!(report.starts_with("Recent 2 transactions:"));
        assert!(report.contains("\"blockNumber\": 990"));
        assert!(report.contains("\"blockNumber\": 970"));
        assert!(!report.contains("\"blockNumber\": 950"));
        assert!(report.contains("/tx/0x"));
        assert!(report.contains("\"address\": \"0x0000000000000000000000000000000000000001\""));
    }

    #[tokio::test]
    async fn empty_window_is_reported_as_text() {
        let chain = MockChain::new();
        chain.set_block_number(10);
        let report = recent_activity(&chain, &Config::default(), vec![], 5)
            .await
            .unwrap();
        assert_eq!(report, "No transactions found in the last 100 blocks.");
        assert_eq!(chain.last_log_range(), Some((0, 10)));
    }
}
