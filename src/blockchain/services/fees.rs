use tracing::info;

use crate::blockchain::{client::ChainClient, models::ChainError};
use crate::utils::format_gwei;

/// Current gas price, rendered in gwei.
pub async fn gas_price_report(chain: &dyn ChainClient) -> Result<String, ChainError> {
    let gas_price = chain.get_gas_price().await?;
    info!("Fetched gas price: {} wei", gas_price);
    Ok(format!("Current gas price: {} gwei", format_gwei(gas_price)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockChain;
    use ethers::types::U256;

    #[tokio::test]
    async fn renders_gwei() {
        let chain = MockChain::new();
        chain.set_gas_price(U256::from(52_500_000_000u64));
        assert_eq!(
            gas_price_report(&chain).await.unwrap(),
            "Current gas price: 52.5 gwei"
        );
    }
}
