// src/blockchain/services/transactions.rs

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use tracing::{error, info, warn};

use crate::blockchain::{
    client::ChainClient,
    models::{ChainError, TransferInstruction, TransferKind, TxOutcome},
    nonce_manager::NonceTracker,
};
use crate::config::Config;
use crate::utils::{checksum, parse_address, parse_amount, TOKEN_DECIMALS};

const BATCH_USAGE: &str =
    "Invalid format. Use: batchMixedTransfer <KIND> <to> <amount> [symbol] ... where KIND is NATIVE or TOKEN (TOKEN takes a symbol)";

/// Submits one validated transfer. `nonce: None` lets the node pick it.
pub async fn submit(
    chain: &dyn ChainClient,
    signer: &LocalWallet,
    instruction: &TransferInstruction,
    nonce: Option<U256>,
) -> Result<TxOutcome, ChainError> {
    let outcome = match &instruction.kind {
        TransferKind::Native => {
            chain
                .send_native_transfer(signer, instruction.to, instruction.amount, nonce)
                .await
        }
        TransferKind::Token { contract, .. } => {
            chain
                .send_token_transfer(signer, *contract, instruction.to, instruction.amount, nonce)
                .await
        }
    }?;
    info!("Tx {} mined in {}", outcome.hash_hex(), outcome.block_label());
    Ok(outcome)
}

/// Validates and executes a single native or token transfer, reporting the
/// outcome as text.
pub async fn transfer(
    chain: &dyn ChainClient,
    config: &Config,
    signer: &LocalWallet,
    kind: TransferKind,
    to: &str,
    amount: &str,
) -> String {
    let to = match parse_address(to) {
        Ok(address) => address,
        Err(_) => return format!("Invalid address: {}", to.trim()),
    };
    let value = match parse_amount(amount, TOKEN_DECIMALS) {
        Ok(value) => value,
        Err(e) => return e,
    };

    let instruction = TransferInstruction {
        kind,
        to,
        amount_display: amount.trim().to_string(),
        amount: value,
    };
    let unit = instruction.unit_label(&config.native_symbol).to_string();
    let recipient = checksum(&to);

    match submit(chain, signer, &instruction, None).await {
        Ok(outcome) => {
            info!(
                "Transfer: {} {} to {}, Tx: {}",
                instruction.amount_display,
                unit,
                recipient,
                outcome.hash_hex()
            );
            format!(
                "Transferred {} {} to {}. Tx: {}",
                instruction.amount_display,
                unit,
                recipient,
                config.tx_url(&outcome.hash_hex())
            )
        }
        Err(e) => {
            error!("Transfer of {} to {} failed: {}", unit, recipient, e);
            format!("Failed to transfer {}: {}", unit, e)
        }
    }
}

/// Parses a batch description of `KIND TO AMOUNT [SYMBOL]` groups.
///
/// The whole list is validated before anything is returned, so a single bad
/// entry means no transfer runs. `lookup` resolves token symbols.
pub fn parse_batch<F>(
    transfers: &str,
    native_symbol: &str,
    lookup: F,
) -> Result<Vec<TransferInstruction>, String>
where
    F: Fn(&str) -> Option<Address>,
{
    let parts: Vec<&str> = transfers.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(BATCH_USAGE.to_string());
    }

    let native_alias = native_symbol.to_uppercase();
    let mut instructions = Vec::new();
    let mut i = 0;

    while i < parts.len() {
        let position = instructions.len() + 1;
        if i + 2 >= parts.len() {
            return Err(format!(
                "Incomplete transfer at position {}: expected <KIND> <to> <amount>",
                position
            ));
        }

        let kind_word = parts[i].to_uppercase();
        let to = parts[i + 1];
        let amount = parts[i + 2];

        let kind = if kind_word == "TOKEN" {
            let symbol = parts.get(i + 3).ok_or_else(|| {
                format!("Missing token symbol for TOKEN transfer at position {}", position)
            })?;
            let contract = lookup(symbol).ok_or_else(|| {
                format!(
                    "Token {} not found. Please create it first using createToken.",
                    symbol
                )
            })?;
            i += 4;
            TransferKind::Token {
                symbol: symbol.to_string(),
                contract,
            }
        } else if kind_word == "NATIVE" || kind_word == native_alias {
            i += 3;
            TransferKind::Native
        } else {
            return Err(format!(
                "Invalid type: {}. Use 'NATIVE', '{}' or 'TOKEN'",
                parts[i], native_alias
            ));
        };

        let to = parse_address(to).map_err(|_| format!("Invalid address: {}", to))?;
        let value = parse_amount(amount, TOKEN_DECIMALS)?;

        instructions.push(TransferInstruction {
            kind,
            to,
            amount_display: amount.to_string(),
            amount: value,
        });
    }

    Ok(instructions)
}

/// Executes validated instructions in order with a locally tracked nonce.
///
/// Each instruction is reported on its own; a failure never stops the
/// remaining ones. Only the initial nonce lookup can fail the whole call.
/// Assumes no other submitter uses the same wallet while the batch runs.
pub async fn execute_batch(
    chain: &dyn ChainClient,
    config: &Config,
    signer: &LocalWallet,
    instructions: &[TransferInstruction],
) -> Result<String, ChainError> {
    let mut nonce = NonceTracker::fetch(chain, signer.address()).await?;
    let mut results = Vec::with_capacity(instructions.len());

    for (index, instruction) in instructions.iter().enumerate() {
        let unit = instruction.unit_label(&config.native_symbol);
        let recipient = checksum(&instruction.to);
        let header = format!(
            "{}. **{} Transfer to {}**:\n   - Amount: {} {}",
            index + 1,
            unit,
            recipient,
            instruction.amount_display,
            unit
        );

        match submit(chain, signer, instruction, Some(nonce.current())).await {
            Ok(outcome) => {
                nonce.advance();
                info!(
                    "Batch transfer {}: {} {} to {}, Tx: {}",
                    index + 1,
                    instruction.amount_display,
                    unit,
                    recipient,
                    outcome.hash_hex()
                );
                results.push(format!(
                    "{}\n   - Status: Successful\n   - Transaction Link: [View Transaction]({})",
                    header,
                    config.tx_url(&outcome.hash_hex())
                ));
            }
            Err(e) => {
                if e.nonce_consumed() {
                    nonce.advance();
                }
                warn!("Batch transfer {} to {} failed: {}", index + 1, recipient, e);
                results.push(format!("{}\n   - Status: Failed\n   - Error: {}", header, e));
            }
        }
    }

    let summary = format!(
        "The batch mixed transfer completed with {} operations:\n\n{}",
        results.len(),
        results.join("\n\n")
    );
    info!("{}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dev_wallet, MockChain};

    const ALICE: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const BOB: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";

    fn registry(symbol: &str) -> Option<Address> {
        (symbol == "MKING").then(|| Address::repeat_byte(0x42))
    }

    #[test]
    fn parses_mixed_kinds_including_native_alias() {
        let batch = format!("NATIVE {ALICE} 0.5 token {BOB} 10 MKING mon {BOB} 1");
        let parsed = parse_batch(&batch, "MON", registry).unwrap();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].kind, TransferKind::Native);
        assert_eq!(parsed[0].amount, U256::exp10(17) * 5);
        assert_eq!(
            parsed[1].kind,
            TransferKind::Token {
                symbol: "MKING".into(),
                contract: Address::repeat_byte(0x42)
            }
        );
        assert_eq!(parsed[1].amount_display, "10");
        assert_eq!(parsed[2].kind, TransferKind::Native);
    }

    #[test]
    fn any_bad_entry_rejects_the_whole_batch() {
        let unknown = format!("NATIVE {ALICE} 1 TOKEN {BOB} 5 NOPE");
        assert_eq!(
            parse_batch(&unknown, "MON", registry).unwrap_err(),
            "Token NOPE not found. Please create it first using createToken."
        );

        let bad_address = format!("NATIVE 0x1234 1 NATIVE {BOB} 1");
        assert_eq!(
            parse_batch(&bad_address, "MON", registry).unwrap_err(),
            "Invalid address: 0x1234"
        );

        let zero = format!("NATIVE {ALICE} 0");
        assert_eq!(
            parse_batch(&zero, "MON", registry).unwrap_err(),
            "Invalid amount: 0"
        );

        let missing_symbol = format!("TOKEN {ALICE} 5");
        assert!(parse_batch(&missing_symbol, "MON", registry)
            .unwrap_err()
            .starts_with("Missing token symbol"));

        let bad_kind = format!("SWAP {ALICE} 5");
        assert!(parse_batch(&bad_kind, "MON", registry)
            .unwrap_err()
            .starts_with("Invalid type: SWAP"));

        assert_eq!(parse_batch("NATIVE", "MON", registry).unwrap_err(), BATCH_USAGE);
        assert!(parse_batch(&format!("NATIVE {ALICE} 1 NATIVE {BOB}"), "MON", registry)
            .unwrap_err()
            .starts_with("Incomplete transfer at position 2"));
    }

    #[tokio::test]
    async fn batch_uses_increasing_nonces_and_reports_each_outcome() {
        let chain = MockChain::new();
        let wallet = dev_wallet();
        chain.set_transaction_count(wallet.address(), U256::from(7u64));
        chain.fail_native_send_to(parse_address(BOB).unwrap(), "insufficient funds for transfer");

        let batch = format!("NATIVE {ALICE} 1 NATIVE {BOB} 2");
        let instructions = parse_batch(&batch, "MON", registry).unwrap();
        let summary = execute_batch(&chain, &Config::default(), wallet.signer(), &instructions)
            .await
            .unwrap();

        assert_eq!(
            chain.sent_nonces(),
            vec![Some(U256::from(7u64)), Some(U256::from(8u64))]
        );
        assert!(summary.starts_with("The batch mixed transfer completed with 2 operations:"));
        assert!(summary.contains("1. **MON Transfer to"));
        assert!(summary.contains("Status: Successful"));
        assert!(summary.contains("2. **MON Transfer to"));
        assert!(summary.contains("Status: Failed"));
        assert!(summary.contains("insufficient funds"));
    }

    #[tokio::test]
    async fn rejected_submission_does_not_burn_the_nonce() {
        let chain = MockChain::new();
        let wallet = dev_wallet();
        chain.fail_native_send_to(parse_address(ALICE).unwrap(), "nonce too low");

        let spec = format!("NATIVE {ALICE} 1 NATIVE {BOB} 1 NATIVE {BOB} 1");
        let instructions = parse_batch(&spec, "MON", registry).unwrap();
        execute_batch(&chain, &Config::default(), wallet.signer(), &instructions)
            .await
            .unwrap();

        assert_eq!(
            chain.sent_nonces(),
            vec![Some(U256::zero()), Some(U256::zero()), Some(U256::one())]
        );
    }

    #[tokio::test]
    async fn single_transfer_reports_link_or_error_text() {
        let chain = MockChain::new();
        let wallet = dev_wallet();
        let config = Config::default();

        let ok = transfer(&chain, &config, wallet.signer(), TransferKind::Native, ALICE, "0.1").await;
        assert!(ok.starts_with("Transferred 0.1 MON to 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed. Tx: "));
        assert!(ok.contains("/tx/0x"));
        assert_eq!(chain.sent_nonces(), vec![None]);

        chain.fail_rpc("connection refused");
        let failed = transfer(&chain, &config, wallet.signer(), TransferKind::Native, ALICE, "0.1").await;
        assert!(failed.starts_with("Failed to transfer MON:"));

        let bad = transfer(&chain, &config, wallet.signer(), TransferKind::Native, "0xnope", "1").await;
        assert_eq!(bad, "Invalid address: 0xnope");
        let negative = transfer(&chain, &config, wallet.signer(), TransferKind::Native, ALICE, "-1").await;
        assert_eq!(negative, "Invalid amount: -1");
    }
}
