//! The fixed command catalog.
//!
//! [`CommandKind`] names every operation and carries its description and
//! JSON input schema (what the planner sees). [`Command`] is a parsed,
//! argument-carrying invocation, built either from a planner tool call or
//! from a slash-style input line.

use secrecy::SecretString;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::utils::{get_optional_arg, get_required_arg, get_text_arg};

pub const DEFAULT_HISTORY_COUNT: usize = 5;
pub const MAX_HISTORY_COUNT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SetWallet,
    DisconnectWallet,
    GetWalletAddress,
    GetBalance,
    TransferTokens,
    TransferToken,
    SignMessage,
    GetTransactionHistory,
    GetGasPrice,
    GetTokenPrice,
    GetTrendingTokens,
    CreateToken,
    GetFaucetTokens,
    BatchMixedTransfer,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 15] = [
        CommandKind::SetWallet,
        CommandKind::DisconnectWallet,
        CommandKind::GetWalletAddress,
        CommandKind::GetBalance,
        CommandKind::TransferTokens,
        CommandKind::TransferToken,
        CommandKind::SignMessage,
        CommandKind::GetTransactionHistory,
        CommandKind::GetGasPrice,
        CommandKind::GetTokenPrice,
        CommandKind::GetTrendingTokens,
        CommandKind::CreateToken,
        CommandKind::GetFaucetTokens,
        CommandKind::BatchMixedTransfer,
        CommandKind::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::SetWallet => "setWallet",
            CommandKind::DisconnectWallet => "disconnectWallet",
            CommandKind::GetWalletAddress => "getWalletAddress",
            CommandKind::GetBalance => "getBalance",
            CommandKind::TransferTokens => "transferTokens",
            CommandKind::TransferToken => "transferToken",
            CommandKind::SignMessage => "signMessage",
            CommandKind::GetTransactionHistory => "getTransactionHistory",
            CommandKind::GetGasPrice => "getGasPrice",
            CommandKind::GetTokenPrice => "getTokenPrice",
            CommandKind::GetTrendingTokens => "getTrendingTokens",
            CommandKind::CreateToken => "createToken",
            CommandKind::GetFaucetTokens => "getFaucetTokens",
            CommandKind::BatchMixedTransfer => "batchMixedTransfer",
            CommandKind::Help => "help",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Short slash alias, e.g. `/balance`.
    fn alias(self) -> &'static str {
        match self {
            CommandKind::SetWallet => "wallet",
            CommandKind::DisconnectWallet => "disconnect",
            CommandKind::GetWalletAddress => "address",
            CommandKind::GetBalance => "balance",
            CommandKind::TransferTokens => "transfer",
            CommandKind::TransferToken => "sendtoken",
            CommandKind::SignMessage => "sign",
            CommandKind::GetTransactionHistory => "history",
            CommandKind::GetGasPrice => "gas",
            CommandKind::GetTokenPrice => "price",
            CommandKind::GetTrendingTokens => "trending",
            CommandKind::CreateToken => "createtoken",
            CommandKind::GetFaucetTokens => "faucet",
            CommandKind::BatchMixedTransfer => "batch",
            CommandKind::Help => "help",
        }
    }

    /// Matches a slash word against the alias or the full name, ignoring case.
    pub fn from_slash(word: &str) -> Option<Self> {
        let word = word.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.alias() == word || kind.name().to_lowercase() == word)
    }

    pub fn description(self) -> &'static str {
        match self {
            CommandKind::SetWallet => "Set the session wallet from a private key. It stays until explicitly disconnected.",
            CommandKind::DisconnectWallet => "Disconnect the current wallet and clear it from memory.",
            CommandKind::GetWalletAddress => "Get the current wallet address.",
            CommandKind::GetBalance => "Check the native balance and the balance of every token created in this session.",
            CommandKind::TransferTokens => "Transfer native currency to an address.",
            CommandKind::TransferToken => "Transfer an ERC-20 token created in this session, by symbol.",
            CommandKind::SignMessage => "Sign a message with the current wallet.",
            CommandKind::GetTransactionHistory => "Get recent on-chain activity for the wallet and its tokens (default 5, max 50).",
            CommandKind::GetGasPrice => "Get the current gas price.",
            CommandKind::GetTokenPrice => "Get a token's USD price by CoinGecko id (e.g. bitcoin).",
            CommandKind::GetTrendingTokens => "Get trending tokens from the network explorer.",
            CommandKind::CreateToken => "Create a new ERC-20 token with burn support. Supply is in whole tokens (18 decimals).",
            CommandKind::GetFaucetTokens => "Request testnet tokens for an address from the faucet.",
            CommandKind::BatchMixedTransfer => "Transfer native currency and tokens in one batch. Format: '<KIND> <to> <amount> [symbol] ...' where KIND is NATIVE or TOKEN (TOKEN takes a symbol), e.g. 'NATIVE 0x12... 0.01 TOKEN 0x45... 10 MKING'.",
            CommandKind::Help => "List all available commands.",
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            CommandKind::SetWallet => "setWallet <privateKey>",
            CommandKind::DisconnectWallet => "disconnectWallet",
            CommandKind::GetWalletAddress => "getWalletAddress",
            CommandKind::GetBalance => "getBalance",
            CommandKind::TransferTokens => "transferTokens <to> <amount>",
            CommandKind::TransferToken => "transferToken <symbol> <to> <amount>",
            CommandKind::SignMessage => "signMessage <message>",
            CommandKind::GetTransactionHistory => "getTransactionHistory [count]",
            CommandKind::GetGasPrice => "getGasPrice",
            CommandKind::GetTokenPrice => "getTokenPrice <token>",
            CommandKind::GetTrendingTokens => "getTrendingTokens",
            CommandKind::CreateToken => "createToken <name> <symbol> <totalSupply>",
            CommandKind::GetFaucetTokens => "getFaucetTokens <address>",
            CommandKind::BatchMixedTransfer => "batchMixedTransfer <KIND> <to> <amount> [symbol] ...",
            CommandKind::Help => "help",
        }
    }

    pub fn input_schema(self) -> Value {
        let string = |description: &str| json!({ "type": "string", "description": description });
        let (properties, required): (Value, Vec<&str>) = match self {
            CommandKind::SetWallet => (
                json!({ "privateKey": string("Hex private key of the wallet") }),
                vec!["privateKey"],
            ),
            CommandKind::TransferTokens => (
                json!({
                    "to": string("Recipient address"),
                    "amount": string("Amount in whole units, e.g. 0.01"),
                }),
                vec!["to", "amount"],
            ),
            CommandKind::TransferToken => (
                json!({
                    "symbol": string("Symbol of a token created in this session"),
                    "to": string("Recipient address"),
                    "amount": string("Amount in whole tokens"),
                }),
                vec!["symbol", "to", "amount"],
            ),
            CommandKind::SignMessage => (
                json!({ "message": string("The message to sign") }),
                vec!["message"],
            ),
            CommandKind::GetTransactionHistory => (
                json!({
                    "count": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_HISTORY_COUNT,
                        "description": "Number of entries to return"
                    }
                }),
                vec![],
            ),
            CommandKind::GetTokenPrice => (
                json!({ "token": string("CoinGecko coin id, e.g. bitcoin") }),
                vec!["token"],
            ),
            CommandKind::CreateToken => (
                json!({
                    "name": string("Token name"),
                    "symbol": string("Token symbol"),
                    "totalSupply": string("Initial supply in whole tokens"),
                }),
                vec!["name", "symbol", "totalSupply"],
            ),
            CommandKind::GetFaucetTokens => (
                json!({ "address": string("Address to fund") }),
                vec!["address"],
            ),
            CommandKind::BatchMixedTransfer => (
                json!({ "transfers": string("Space-separated '<KIND> <to> <amount> [symbol]' groups") }),
                vec!["transfers"],
            ),
            CommandKind::DisconnectWallet
            | CommandKind::GetWalletAddress
            | CommandKind::GetBalance
            | CommandKind::GetGasPrice
            | CommandKind::GetTrendingTokens
            | CommandKind::Help => (json!({}), vec![]),
        };

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }
}

/// Catalog entry as presented to the planner.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub fn catalog() -> Vec<ToolSpec> {
    CommandKind::ALL
        .into_iter()
        .map(|kind| ToolSpec {
            name: kind.name(),
            description: kind.description(),
            parameters: kind.input_schema(),
        })
        .collect()
}

/// The fixed command list. Does not depend on wallet or registry state.
pub fn help_text() -> String {
    let lines: Vec<String> = CommandKind::ALL
        .into_iter()
        .map(|kind| format!("{} - {}", kind.usage(), kind.description()))
        .collect();
    format!(
        "Available commands:\n{}\n\nAny command can also be typed directly with a leading '/', e.g. /balance or /transfer <to> <amount>.",
        lines.join("\n")
    )
}

#[derive(Debug)]
pub enum Command {
    SetWallet { private_key: SecretString },
    DisconnectWallet,
    GetWalletAddress,
    GetBalance,
    TransferTokens { to: String, amount: String },
    TransferToken { symbol: String, to: String, amount: String },
    SignMessage { message: String },
    GetTransactionHistory { count: usize },
    GetGasPrice,
    GetTokenPrice { token: String },
    GetTrendingTokens,
    CreateToken { name: String, symbol: String, total_supply: String },
    GetFaucetTokens { address: String },
    BatchMixedTransfer { transfers: String },
    Help,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetWallet { .. } => CommandKind::SetWallet,
            Command::DisconnectWallet => CommandKind::DisconnectWallet,
            Command::GetWalletAddress => CommandKind::GetWalletAddress,
            Command::GetBalance => CommandKind::GetBalance,
            Command::TransferTokens { .. } => CommandKind::TransferTokens,
            Command::TransferToken { .. } => CommandKind::TransferToken,
            Command::SignMessage { .. } => CommandKind::SignMessage,
            Command::GetTransactionHistory { .. } => CommandKind::GetTransactionHistory,
            Command::GetGasPrice => CommandKind::GetGasPrice,
            Command::GetTokenPrice { .. } => CommandKind::GetTokenPrice,
            Command::GetTrendingTokens => CommandKind::GetTrendingTokens,
            Command::CreateToken { .. } => CommandKind::CreateToken,
            Command::GetFaucetTokens { .. } => CommandKind::GetFaucetTokens,
            Command::BatchMixedTransfer { .. } => CommandKind::BatchMixedTransfer,
            Command::Help => CommandKind::Help,
        }
    }

    /// Builds a command from a catalog name and JSON arguments. Errors are
    /// user-facing text.
    pub fn from_call(name: &str, args: &Value) -> Result<Self, String> {
        let kind = CommandKind::from_name(name).ok_or_else(|| format!("Unknown command: {}", name))?;

        let command = match kind {
            CommandKind::SetWallet => Command::SetWallet {
                private_key: SecretString::new(get_required_arg::<String>(args, "privateKey")?),
            },
            CommandKind::DisconnectWallet => Command::DisconnectWallet,
            CommandKind::GetWalletAddress => Command::GetWalletAddress,
            CommandKind::GetBalance => Command::GetBalance,
            CommandKind::TransferTokens => Command::TransferTokens {
                to: get_text_arg(args, "to")?,
                amount: get_text_arg(args, "amount")?,
            },
            CommandKind::TransferToken => Command::TransferToken {
                symbol: get_text_arg(args, "symbol")?,
                to: get_text_arg(args, "to")?,
                amount: get_text_arg(args, "amount")?,
            },
            CommandKind::SignMessage => Command::SignMessage {
                message: get_required_arg(args, "message")?,
            },
            CommandKind::GetTransactionHistory => Command::GetTransactionHistory {
                count: history_count(args)?,
            },
            CommandKind::GetGasPrice => Command::GetGasPrice,
            CommandKind::GetTokenPrice => Command::GetTokenPrice {
                token: get_text_arg(args, "token")?,
            },
            CommandKind::GetTrendingTokens => Command::GetTrendingTokens,
            CommandKind::CreateToken => Command::CreateToken {
                name: get_text_arg(args, "name")?,
                symbol: get_text_arg(args, "symbol")?,
                total_supply: get_text_arg(args, "totalSupply")?,
            },
            CommandKind::GetFaucetTokens => Command::GetFaucetTokens {
                address: get_text_arg(args, "address")?,
            },
            CommandKind::BatchMixedTransfer => Command::BatchMixedTransfer {
                transfers: get_text_arg(args, "transfers")?,
            },
            CommandKind::Help => Command::Help,
        };
        Ok(command)
    }

    /// Parses `/command arg ...` input. The leading slash is required.
    pub fn parse_slash(input: &str) -> Result<Self, String> {
        let line = input.trim().strip_prefix('/').unwrap_or_default().trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let kind = CommandKind::from_slash(word).ok_or_else(|| {
            format!("Unknown command: /{}. Type /help to list commands.", word)
        })?;
        let usage = || format!("Usage: /{}", kind.usage());
        let parts: Vec<&str> = rest.split_whitespace().collect();

        let mut args = Map::new();
        let mut put = |key: &str, value: &str| {
            args.insert(key.to_string(), Value::String(value.to_string()));
        };

        match kind {
            CommandKind::SetWallet | CommandKind::GetTokenPrice | CommandKind::GetFaucetTokens => {
                let [value] = parts.as_slice() else {
                    return Err(usage());
                };
                let key = match kind {
                    CommandKind::SetWallet => "privateKey",
                    CommandKind::GetTokenPrice => "token",
                    _ => "address",
                };
                put(key, *value);
            }
            CommandKind::TransferTokens => {
                let [to, amount] = parts.as_slice() else {
                    return Err(usage());
                };
                put("to", *to);
                put("amount", *amount);
            }
            CommandKind::TransferToken => {
                let [symbol, to, amount] = parts.as_slice() else {
                    return Err(usage());
                };
                put("symbol", *symbol);
                put("to", *to);
                put("amount", *amount);
            }
            CommandKind::CreateToken => {
                // The name may contain spaces; symbol and supply are the last two words.
                if parts.len() < 3 {
                    return Err(usage());
                }
                let (name, tail) = parts.split_at(parts.len() - 2);
                put("name", name.join(" ").as_str());
                put("symbol", tail[0]);
                put("totalSupply", tail[1]);
            }
            CommandKind::SignMessage | CommandKind::BatchMixedTransfer => {
                if rest.is_empty() {
                    return Err(usage());
                }
                let key = if kind == CommandKind::SignMessage {
                    "message"
                } else {
                    "transfers"
                };
                put(key, rest);
            }
            CommandKind::GetTransactionHistory => match parts.as_slice() {
                [] => {}
                [count] => put("count", *count),
                _ => return Err(usage()),
            },
            CommandKind::DisconnectWallet
            | CommandKind::GetWalletAddress
            | CommandKind::GetBalance
            | CommandKind::GetGasPrice
            | CommandKind::GetTrendingTokens
            | CommandKind::Help => {
                if !parts.is_empty() {
                    return Err(usage());
                }
            }
        }

        Self::from_call(kind.name(), &Value::Object(args))
    }
}

/// `count` may arrive as a number or a numeric string. Clamped to
/// `1..=MAX_HISTORY_COUNT`.
fn history_count(args: &Value) -> Result<usize, String> {
    let count = match args.get("count") {
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<u64>()
                .map_err(|_| format!("Invalid argument: 'count' ({})", s))?,
        ),
        _ => get_optional_arg::<u64>(args, "count")?,
    };
    let count = count.map_or(DEFAULT_HISTORY_COUNT, |c| c as usize);
    Ok(count.clamp(1, MAX_HISTORY_COUNT))
}
