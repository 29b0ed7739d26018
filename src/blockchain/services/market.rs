//! Market data: token prices from a CoinGecko-compatible API and the
//! trending-token table scraped from the network explorer.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingToken {
    pub token: String,
    pub price: String,
}

#[derive(Clone)]
pub struct MarketClient {
    client: Client,
    coingecko_base_url: String,
    coingecko_api_key: Option<String>,
    explorer_url: String,
}

impl MarketClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build market HTTP client")?;
        Ok(Self {
            client,
            coingecko_base_url: config.coingecko_base_url.clone(),
            coingecko_api_key: config.coingecko_api_key.clone(),
            explorer_url: config.explorer_url.clone(),
        })
    }

    /// Shared HTTP client, reused by other outbound calls.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// USD price for a CoinGecko coin id. `Ok(None)` when the id is unknown.
    pub async fn token_price(&self, token: &str) -> Result<Option<f64>> {
        let id = token.trim().to_lowercase();
        let url = format!(
            "{}/simple/price",
            self.coingecko_base_url.trim_end_matches('/')
        );

        let mut request = self
            .client
            .get(&url)
            .query(&[("ids", id.as_str()), ("vs_currencies", "usd")]);
        if let Some(key) = &self.coingecko_api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let resp = request.send().await.context("price request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!("price API returned status {}", resp.status()));
        }
        let body: Value = resp.json().await.context("invalid price API response")?;
        debug!("Price response for {}: {}", id, body);

        Ok(body.get(&id).and_then(|v| v["usd"].as_f64()))
    }

    /// First `limit` rows of the explorer's token table.
    pub async fn trending_tokens(&self, limit: usize) -> Result<Vec<TrendingToken>> {
        let url = format!("{}/tokens", self.explorer_url.trim_end_matches('/'));
        info!("Scraping trending tokens from {}", url);

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .context("explorer request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!("explorer returned status {}", resp.status()));
        }
        let html = resp.text().await.context("failed to read explorer page")?;

        let mut tokens = parse_token_table(&html)?;
        tokens.truncate(limit);
        Ok(tokens)
    }
}

/// Extracts `(first cell, second cell)` pairs from every `table tbody tr`,
/// skipping rows where either cell is empty.
pub fn parse_token_table(html: &str) -> Result<Vec<TrendingToken>> {
    let rows = Selector::parse("table tbody tr").map_err(|e| anyhow!("bad selector: {}", e))?;
    let name_cell =
        Selector::parse("td:nth-child(1)").map_err(|e| anyhow!("bad selector: {}", e))?;
    let price_cell =
        Selector::parse("td:nth-child(2)").map_err(|e| anyhow!("bad selector: {}", e))?;

    let document = Html::parse_document(html);
    let cell_text = |row: &scraper::ElementRef, selector: &Selector| -> String {
        row.select(selector)
            .next()
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    };

    Ok(document
        .select(&rows)
        .filter_map(|row| {
            let token = cell_text(&row, &name_cell);
            let price = cell_text(&row, &price_cell);
            (!token.is_empty() && !price.is_empty()).then_some(TrendingToken { token, price })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_skips_incomplete_ones() {
        let html = r#"
            <html><body><table>
              <thead><tr><th>Token</th><th>Price</th></tr></thead>
              <tbody>
                <tr><td> Wrapped MON </td><td>$1.02</td></tr>
                <tr><td>NoPrice</td><td>  </td></tr>
                <tr><td>USDC</td><td>$1.00</td><td>extra</td></tr>
              </tbody>
            </table></body></html>"#;

        let tokens = parse_token_table(html).unwrap();
        assert_eq!(
            tokens,
            vec![
                TrendingToken { token: "Wrapped MON".into(), price: "$1.02".into() },
                TrendingToken { token: "USDC".into(), price: "$1.00".into() },
            ]
        );
    }

    #[test]
    fn page_without_table_yields_nothing() {
        assert!(parse_token_table("<html><p>maintenance</p></html>")
            .unwrap()
            .is_empty());
    }
}
