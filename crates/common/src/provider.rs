//! Wallet Provider Abstraction
//!
//! This module defines the [`WalletProvider`] trait as the contract for
//! talking to an Ethereum wallet/node endpoint. It covers exactly the
//! operations the wallet connector and the donation workflow need: account
//! access, balance and fee queries, transaction submission, read-only calls,
//! and receipt observation.
//!
//! Two implementations exist:
//!
//! - [`crate::EthProvider`]: JSON-RPC 2.0 over HTTP
//! - [`crate::MockProvider`]: fully in-memory, for tests
//!
//! Quantities cross this boundary as integers (wei as `u128`, gas as `u64`).
//! Hex encoding is an implementation detail of the JSON-RPC backend.

use async_trait::async_trait;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// REQUEST / RESPONSE TYPES
// ════════════════════════════════════════════════════════════════════════════

/// A transaction to estimate or submit.
///
/// `data` is raw calldata; empty for a plain value transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    /// Sender address (0x-prefixed, 20 bytes hex).
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Value in wei.
    pub value_wei: u128,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
}

/// A read-only contract call (`eth_call`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Contract address.
    pub to: String,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
}

/// A mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_hash: String,
    /// True if the transaction succeeded, false if it reverted on-chain.
    pub status: bool,
    /// Block the transaction was included in.
    pub block_number: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by a wallet provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// No provider is reachable at the configured endpoint.
    #[error("wallet provider unavailable")]
    Unavailable,

    /// The user rejected the request in the wallet (EIP-1193 code 4001).
    #[error("user rejected the request")]
    UserRejected,

    /// Transport-level failure (connection, timeout, malformed HTTP).
    #[error("network error: {0}")]
    Network(String),

    /// The node returned a JSON-RPC error that maps to no other variant.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Execution reverted; the message is forwarded verbatim when available.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// The response was syntactically valid but not what was asked for.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

// ════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Contract for an Ethereum wallet/node endpoint.
///
/// All methods are fallible and must not panic; callers convert every error
/// into a user-visible message at the call site.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access interactively (EIP-1102 `eth_requestAccounts`).
    ///
    /// May prompt the user; a denial is [`ProviderError::UserRejected`].
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Query already-authorized accounts without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Chain id of the connected network.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Native-currency balance of `address`, in wei.
    async fn get_balance(&self, address: &str) -> Result<u128, ProviderError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ProviderError>;

    /// Estimated gas units for `tx`.
    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ProviderError>;

    /// Sign and broadcast `tx`; returns the transaction hash.
    ///
    /// Once this returns, the network owns the transaction; the caller can
    /// only observe its outcome via [`Self::transaction_receipt`].
    async fn send_transaction(&self, tx: &TxRequest) -> Result<String, ProviderError>;

    /// Execute a read-only call and return the raw return data.
    async fn call(&self, req: &CallRequest) -> Result<Vec<u8>, ProviderError>;

    /// Receipt for `tx_hash`, or `None` while the transaction is pending.
    async fn transaction_receipt(&self, tx_hash: &str)
        -> Result<Option<TxReceipt>, ProviderError>;

    /// Latest block number (used to count confirmations).
    async fn block_number(&self) -> Result<u64, ProviderError>;
}
