//! # Fundra Common Crate
//!
//! Shared foundation for the Fundra donation client.
//!
//! ## Modules
//! - `provider`: [`WalletProvider`] trait definition
//! - `eth_provider`: JSON-RPC implementation
//! - `mock_provider`: mock implementation for testing
//! - `units`: exact ETH/wei decimal conversion
//! - `config`: configuration management
//!
//! ## Provider Architecture
//! ```text
//! ┌──────────────────┐
//! │  WalletProvider  │  <- Abstract trait
//! └────────┬─────────┘
//!          │
//!    ┌─────┴──────┐
//!    │            │
//! ┌──▼────────┐ ┌─▼────────────┐
//! │EthProvider│ │ MockProvider │
//! └───────────┘ └──────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let provider = EthProvider::new(&cfg.rpc_url, cfg.request_timeout_ms)?;
//! let accounts = provider.request_accounts().await?;
//! let balance = provider.get_balance(&accounts[0]).await?;
//! ```

pub mod config;
pub mod eth_provider;
pub mod mock_provider;
pub mod provider;
pub mod units;

pub use config::{load_from_file, Config, ConfigError};
pub use eth_provider::EthProvider;
pub use mock_provider::MockProvider;
pub use provider::{CallRequest, ProviderError, TxReceipt, TxRequest, WalletProvider};
pub use units::{format_wei, parse_eth, total_cost, UnitsError, ETH_DECIMALS, WEI_PER_ETH};
