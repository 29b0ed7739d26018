//! Command execution.
//!
//! Every outcome is text: validation problems, a missing wallet and chain
//! failures are all reported as a message so the dispatch loop can feed the
//! result back to the planner and carry on.

use ethers::types::Address;
use tracing::{error, info, warn};

use crate::agent::session::Session;
use crate::agent::tools::{help_text, Command};
use crate::blockchain::{
    client::ChainClient,
    models::TransferKind,
    services::{balance, faucet, fees, history, market::MarketClient, token, transactions},
    wallet_manager::SessionWallet,
};
use crate::config::Config;
use crate::utils::{checksum, parse_address, parse_amount, TOKEN_DECIMALS};

pub const NO_WALLET: &str = "No wallet set. Please set a wallet with 'setWallet <privateKey>' first.";

const TRENDING_LIMIT: usize = 5;

/// Everything a command needs for one execution.
pub struct ToolContext<'a> {
    pub chain: &'a dyn ChainClient,
    pub session: &'a Session,
    pub market: &'a MarketClient,
    pub config: &'a Config,
}

impl ToolContext<'_> {
    async fn wallet(&self) -> Result<SessionWallet, String> {
        self.session.wallet.get().await.ok_or_else(|| NO_WALLET.to_string())
    }
}

pub async fn execute(command: Command, ctx: &ToolContext<'_>) -> String {
    let kind = command.kind();
    info!("Executing {} in session {}", kind.name(), ctx.session.id);

    let outcome = match command {
        Command::Help => Ok(help_text()),
        Command::SetWallet { private_key } => match SessionWallet::from_private_key(&private_key) {
            Ok(wallet) => {
                let address = wallet.address_string();
                ctx.session.wallet.set(wallet).await;
                Ok(format!("Wallet set to address: {}", address))
            }
            Err(e) => Err(format!("Failed to set wallet: {}", e)),
        },
        Command::DisconnectWallet => {
            if ctx.session.wallet.clear().await {
                Ok("Wallet disconnected successfully".to_string())
            } else {
                Ok("No wallet was connected.".to_string())
            }
        }
        Command::GetWalletAddress => ctx.wallet().await.map(|w| w.address_string()),
        Command::GetBalance => get_balance(ctx).await,
        Command::TransferTokens { to, amount } => match ctx.wallet().await {
            Ok(wallet) => Ok(transactions::transfer(
                ctx.chain,
                ctx.config,
                wallet.signer(),
                TransferKind::Native,
                &to,
                &amount,
            )
            .await),
            Err(e) => Err(e),
        },
        Command::TransferToken { symbol, to, amount } => transfer_token(ctx, symbol, &to, &amount).await,
        Command::SignMessage { message } => match ctx.wallet().await {
            Ok(wallet) => wallet
                .sign_message(&message)
                .await
                .map(|signature| format!("Message signed: {}", signature))
                .map_err(|e| format!("Failed to sign message: {}", e)),
            Err(e) => Err(e),
        },
        Command::GetTransactionHistory { count } => get_history(ctx, count).await,
        Command::GetGasPrice => fees::gas_price_report(ctx.chain)
            .await
            .map_err(|e| format!("Failed to fetch gas price: {}", e)),
        Command::GetTokenPrice { token } => match ctx.market.token_price(&token).await {
            Ok(Some(price)) => Ok(format!("Price of {}: ${} USD", token, price)),
            Ok(None) => Ok(format!("Price not found for {}", token)),
            Err(e) => Err(format!("Failed to fetch token price: {:#}", e)),
        },
        Command::GetTrendingTokens => get_trending(ctx).await,
        Command::CreateToken {
            name,
            symbol,
            total_supply,
        } => create_token(ctx, &name, &symbol, &total_supply).await,
        Command::GetFaucetTokens { address } => get_faucet_tokens(ctx, &address).await,
        Command::BatchMixedTransfer { transfers } => batch_transfer(ctx, &transfers).await,
    };

    match outcome {
        Ok(text) => text,
        Err(text) => {
            warn!("{} returned an error: {}", kind.name(), text);
            text
        }
    }
}

async fn get_balance(ctx: &ToolContext<'_>) -> Result<String, String> {
    let wallet = ctx.wallet().await?;
    let tokens = ctx.session.tokens.entries();
    balance::balance_report(ctx.chain, wallet.address(), &tokens, &ctx.config.native_symbol)
        .await
        .map_err(|e| format!("Failed to fetch balance: {}", e))
}

async fn transfer_token(
    ctx: &ToolContext<'_>,
    symbol: String,
    to: &str,
    amount: &str,
) -> Result<String, String> {
    let wallet = ctx.wallet().await?;
    let contract = ctx.session.tokens.lookup(&symbol).ok_or_else(|| {
        format!("Token {} not found. Please create it first using createToken.", symbol)
    })?;
    Ok(transactions::transfer(
        ctx.chain,
        ctx.config,
        wallet.signer(),
        TransferKind::Token { symbol, contract },
        to,
        amount,
    )
    .await)
}

async fn get_history(ctx: &ToolContext<'_>, count: usize) -> Result<String, String> {
    let wallet = ctx.wallet().await?;
    let mut addresses = vec![wallet.address()];
    addresses.extend(ctx.session.tokens.entries().into_iter().map(|(_, a)| a));
    history::recent_activity(ctx.chain, ctx.config, addresses, count)
        .await
        .map_err(|e| format!("Failed to fetch transaction history: {}", e))
}

async fn get_trending(ctx: &ToolContext<'_>) -> Result<String, String> {
    let tokens = ctx
        .market
        .trending_tokens(TRENDING_LIMIT)
        .await
        .map_err(|e| format!("Failed to fetch trending tokens: {:#}", e))?;
    if tokens.is_empty() {
        return Ok("No token data found on the explorer.".to_string());
    }
    let rendered = serde_json::to_string_pretty(&tokens)
        .map_err(|e| format!("Failed to fetch trending tokens: {}", e))?;
    Ok(format!(
        "Trending tokens from {}:\n{}",
        ctx.config.network_name, rendered
    ))
}

async fn create_token(
    ctx: &ToolContext<'_>,
    name: &str,
    symbol: &str,
    total_supply: &str,
) -> Result<String, String> {
    let wallet = ctx.wallet().await?;
    let supply = parse_amount(total_supply, TOKEN_DECIMALS)
        .map_err(|_| format!("Invalid total supply: {}", total_supply))?;
    if let Some(existing) = ctx.session.tokens.lookup(symbol) {
        return Err(format!(
            "Token symbol {} is already registered at {}",
            symbol,
            checksum(&existing)
        ));
    }

    let address: Address = token::deploy_token(ctx.chain, wallet.signer(), name, symbol, supply)
        .await
        .map_err(|e| {
            error!("Token deployment failed: {}", e);
            format!("Failed to create token: {}", e)
        })?;

    let rendered = checksum(&address);
    if !ctx.session.tokens.register(symbol, address) {
        warn!("Symbol {} was registered concurrently; keeping the earlier entry", symbol);
        return Ok(format!(
            "Token {} ({}) deployed at {}, but the symbol was registered meanwhile by another token, so it is not tracked.",
            name,
            symbol,
            ctx.config.address_url(&rendered)
        ));
    }
    Ok(format!(
        "Token {} ({}) created successfully at {}",
        name,
        symbol,
        ctx.config.address_url(&rendered)
    ))
}

async fn get_faucet_tokens(ctx: &ToolContext<'_>, address: &str) -> Result<String, String> {
    let recipient = parse_address(address)
        .map_err(|_| "Invalid Ethereum address provided.".to_string())?;
    let recipient = checksum(&recipient);

    match &ctx.config.faucet_api_url {
        Some(api_url) => faucet::request_faucet_tokens(
            ctx.market.http(),
            api_url,
            &ctx.config.network_name,
            &recipient,
        )
        .await
        .map(|tx_hash| {
            format!(
                "Faucet request submitted for {}. Tx: {}",
                recipient,
                ctx.config.tx_url(&tx_hash)
            )
        })
        .map_err(|e| format!("Failed to process faucet request: {:#}", e)),
        None => Ok(faucet::faucet_instructions(ctx.config, &recipient)),
    }
}

async fn batch_transfer(ctx: &ToolContext<'_>, transfers: &str) -> Result<String, String> {
    let wallet = ctx.wallet().await?;
    let registry = &ctx.session.tokens;
    let instructions =
        transactions::parse_batch(transfers, &ctx.config.native_symbol, |symbol| registry.lookup(symbol))?;

    transactions::execute_batch(ctx.chain, ctx.config, wallet.signer(), &instructions)
        .await
        .map_err(|e| format!("Failed to start batch transfer: {}", e))
}
