use ethers::types::Address;
use tracing::error;

use crate::blockchain::{client::ChainClient, models::ChainError};
use crate::utils::{format_amount, TOKEN_DECIMALS};

/// Native balance line followed by one line per registered token.
///
/// A failure on the native balance fails the report; a failure on a single
/// token only degrades that token's line.
pub async fn balance_report(
    chain: &dyn ChainClient,
    owner: Address,
    tokens: &[(String, Address)],
    native_symbol: &str,
) -> Result<String, ChainError> {
    let native = chain.get_balance(owner).await?;
    let mut lines = vec![format!(
        "{} Balance: {} {}",
        native_symbol,
        format_amount(native, TOKEN_DECIMALS),
        native_symbol
    )];

    for (symbol, contract) in tokens {
        match chain.get_token_balance(*contract, owner).await {
            Ok(balance) => lines.push(format!(
                "{} Balance: {} {}",
                symbol,
                format_amount(balance, TOKEN_DECIMALS),
                symbol
            )),
            Err(e) => {
                error!("Error fetching balance for {}: {}", symbol, e);
                lines.push(format!("{} Balance: Unable to fetch", symbol));
            }
        }
    }

    Ok(lines.join("\n"))
}
