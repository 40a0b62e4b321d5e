//! Simple config loader using TOML and serde.
//!
//! Contract address and ABI path are injected configuration, never compiled
//! in: they are optional here and validated by the component that needs
//! them. Defaults point at the local development endpoints.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors from config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the funds backend REST API.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Wallet / node JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Expected chain id, if pinned.
    pub chain_id: Option<u64>,

    /// Donation contract address (0x-prefixed). Required for on-chain
    /// operations; absence is an error at use time, not load time.
    pub contract_address: Option<String>,

    /// Path to the contract interface description (JSON ABI asset).
    pub abi_path: Option<String>,

    /// Path of the persisted wallet session file.
    #[serde(default = "default_session_path")]
    pub session_path: String,

    /// Timeout for HTTP requests, milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_session_path() -> String {
    "./session.json".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: default_backend_url(),
            rpc_url: default_rpc_url(),
            chain_id: None,
            contract_address: None,
            abi_path: None,
            session_path: default_session_path(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

/// Load config from a TOML file path.
/// If the file is missing or fails to parse, an error is returned.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path.as_ref())?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

impl Config {
    /// Build a config from environment variables, starting from defaults.
    ///
    /// Read variables:
    /// - `FUNDRA_BACKEND_URL`
    /// - `FUNDRA_RPC_URL`
    /// - `FUNDRA_CHAIN_ID`
    /// - `FUNDRA_CONTRACT_ADDRESS`
    /// - `FUNDRA_ABI_PATH`
    /// - `FUNDRA_SESSION_PATH`
    /// - `FUNDRA_TIMEOUT_MS`
    ///
    /// All are optional; numeric values that fail to parse are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Config::default();

        if let Ok(v) = std::env::var("FUNDRA_BACKEND_URL") {
            cfg.backend_url = v;
        }
        if let Ok(v) = std::env::var("FUNDRA_RPC_URL") {
            cfg.rpc_url = v;
        }
        if let Ok(v) = std::env::var("FUNDRA_CHAIN_ID") {
            cfg.chain_id = Some(parse_env_u64("FUNDRA_CHAIN_ID", &v)?);
        }
        if let Ok(v) = std::env::var("FUNDRA_CONTRACT_ADDRESS") {
            cfg.contract_address = Some(v);
        }
        if let Ok(v) = std::env::var("FUNDRA_ABI_PATH") {
            cfg.abi_path = Some(v);
        }
        if let Ok(v) = std::env::var("FUNDRA_SESSION_PATH") {
            cfg.session_path = v;
        }
        if let Ok(v) = std::env::var("FUNDRA_TIMEOUT_MS") {
            cfg.request_timeout_ms = parse_env_u64("FUNDRA_TIMEOUT_MS", &v)?;
        }

        Ok(cfg)
    }
}

fn parse_env_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("expected an integer, got {:?}", value),
    })
}
