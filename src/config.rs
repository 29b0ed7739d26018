// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,
    pub bind_addr: String,
    /// Single origin allowed by CORS. `None` keeps CORS permissive.
    pub cors_origin: Option<String>,

    // Sessions
    pub session_idle_timeout: Duration,
    pub max_sessions: usize,

    // Chain settings
    pub rpc_url: String,
    pub network_name: String,
    pub native_symbol: String,
    pub explorer_url: String,
    pub receipt_timeout: Duration,
    pub history_block_window: u64,

    // Faucet
    pub faucet_url: String,
    pub faucet_api_url: Option<String>,

    // Language model
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub model_timeout: Duration,
    pub max_agent_steps: usize,

    // Market data
    pub coingecko_api_key: Option<String>,
    pub coingecko_base_url: String,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_addr: "0.0.0.0".to_string(),
            cors_origin: None,
            session_idle_timeout: Duration::from_secs(1800),
            max_sessions: 1000,
            rpc_url: "https://testnet-rpc.monad.xyz".to_string(),
            network_name: "Monad Testnet".to_string(),
            native_symbol: "MON".to_string(),
            explorer_url: "https://monad-testnet.socialscan.io".to_string(),
            receipt_timeout: Duration::from_secs(120),
            history_block_window: 100,
            faucet_url: "https://testnet.monad.xyz/".to_string(),
            faucet_api_url: None,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            model_timeout: Duration::from_secs(60),
            max_agent_steps: 8,
            coingecko_api_key: None,
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            http_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            port: parse_var("PORT", defaults.port)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            cors_origin: optional_var("CORS_ORIGIN"),

            session_idle_timeout: Duration::from_secs(parse_var(
                "SESSION_IDLE_TIMEOUT_SECS",
                defaults.session_idle_timeout.as_secs(),
            )?),
            max_sessions: parse_var("MAX_SESSIONS", defaults.max_sessions)?,

            rpc_url: url_var("RPC_URL", defaults.rpc_url)?,
            network_name: env::var("NETWORK_NAME").unwrap_or(defaults.network_name),
            native_symbol: env::var("NATIVE_SYMBOL").unwrap_or(defaults.native_symbol),
            explorer_url: url_var("EXPLORER_URL", defaults.explorer_url)?,
            receipt_timeout: Duration::from_secs(parse_var(
                "RECEIPT_TIMEOUT_SECS",
                defaults.receipt_timeout.as_secs(),
            )?),
            history_block_window: parse_var("HISTORY_BLOCK_WINDOW", defaults.history_block_window)?,

            faucet_url: url_var("FAUCET_URL", defaults.faucet_url)?,
            faucet_api_url: optional_url_var("FAUCET_API_URL")?,

            openai_api_key: optional_var("OPENAI_API_KEY"),
            openai_base_url: url_var("OPENAI_BASE_URL", defaults.openai_base_url)?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            model_timeout: Duration::from_secs(parse_var(
                "MODEL_TIMEOUT_SECS",
                defaults.model_timeout.as_secs(),
            )?),
            max_agent_steps: parse_var("MAX_AGENT_STEPS", defaults.max_agent_steps)?,

            coingecko_api_key: optional_var("COINGECKO_API_KEY"),
            coingecko_base_url: url_var("COINGECKO_BASE_URL", defaults.coingecko_base_url)?,
            http_timeout: Duration::from_secs(parse_var(
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
        };

        if config.max_agent_steps == 0 {
            anyhow::bail!("MAX_AGENT_STEPS must be at least 1");
        }
        if config.max_sessions == 0 {
            anyhow::bail!("MAX_SESSIONS must be at least 1");
        }
        if config.session_idle_timeout.is_zero() {
            anyhow::bail!("SESSION_IDLE_TIMEOUT_SECS must be at least 1");
        }

        Ok(config)
    }

    /// How often idle sessions are swept: a quarter of the idle timeout,
    /// between one second and one minute.
    pub fn session_sweep_interval(&self) -> Duration {
        (self.session_idle_timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    /// Explorer link for an account or contract.
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        None => Ok(default),
    }
}

fn url_var(name: &str, default: String) -> Result<String> {
    let value = optional_var(name).unwrap_or(default);
    Url::parse(&value).with_context(|| format!("{} must be a valid URL", name))?;
    Ok(value)
}

fn optional_url_var(name: &str) -> Result<Option<String>> {
    match optional_var(name) {
        Some(value) => {
            Url::parse(&value).with_context(|| format!("{} must be a valid URL", name))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
