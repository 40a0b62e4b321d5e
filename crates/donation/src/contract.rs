//! # Contract Binding
//!
//! Thin binding of a fixed contract address and its interface description to
//! a [`WalletProvider`]. No business logic lives here: each method is
//! selector + encode + provider call + decode, exposing exactly the surface
//! the donation workflow needs.
//!
//! The return shapes of the three view methods are fixed by the platform
//! contract:
//!
//! ```text
//! getProjectStats()            -> (uint256 totalDonations,
//!                                  uint256 donatorsCount,
//!                                  uint256 progressPercent)
//! getRecentDonators(uint256)   -> (string name, address wallet,
//!                                  uint256 amount, uint256 timestamp)[]
//! getRecentTransactions(uint256) -> (uint256 value, string txHash,
//!                                  uint256 timestamp, string status)[]
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use fundra_common::provider::{CallRequest, ProviderError, TxRequest, WalletProvider};

use crate::abi::{AbiError, ContractAbi, Decoder};

// ════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════

/// Aggregate donation statistics for the bound campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStats {
    pub total_donations_wei: u128,
    pub donators_count: u64,
    pub progress_percent: u64,
}

/// One recent donor entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donator {
    pub name: String,
    pub wallet_address: String,
    pub amount_wei: u128,
    pub timestamp: u64,
}

/// One recent on-chain transaction entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTx {
    pub value_wei: u128,
    pub tx_hash: String,
    pub timestamp: u64,
    pub status: String,
}

/// Errors from binding operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

// ════════════════════════════════════════════════════════════════════════════
// BINDING
// ════════════════════════════════════════════════════════════════════════════

/// A contract address plus interface, bound to a provider.
pub struct ContractBinding {
    address: String,
    abi: ContractAbi,
    provider: Arc<dyn WalletProvider>,
}

impl ContractBinding {
    pub fn new(
        address: impl Into<String>,
        abi: ContractAbi,
        provider: Arc<dyn WalletProvider>,
    ) -> Self {
        Self {
            address: address.into(),
            abi,
            provider,
        }
    }

    /// Address this binding points at.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Calldata for the payable `donate()` method.
    pub fn donate_calldata(&self) -> Result<Vec<u8>, ContractError> {
        Ok(self.abi.encode_call_uints("donate", &[])?)
    }

    /// Transaction request for a donation of `amount_wei` from `from`.
    pub fn donate_request(&self, from: &str, amount_wei: u128) -> Result<TxRequest, ContractError> {
        Ok(TxRequest {
            from: from.to_string(),
            to: self.address.clone(),
            value_wei: amount_wei,
            data: self.donate_calldata()?,
        })
    }

    /// Sign and broadcast a donation; returns the transaction hash.
    pub async fn donate(&self, from: &str, amount_wei: u128) -> Result<String, ContractError> {
        let tx = self.donate_request(from, amount_wei)?;
        debug!(to = %self.address, amount_wei, "sending donate transaction");
        Ok(self.provider.send_transaction(&tx).await?)
    }

    /// Aggregate stats view.
    pub async fn get_project_stats(&self) -> Result<ProjectStats, ContractError> {
        let data = self.view_call("getProjectStats", &[]).await?;
        let decoder = Decoder::new(&data);
        Ok(ProjectStats {
            total_donations_wei: decoder.uint(0)?,
            donators_count: decoder.uint64(1)?,
            progress_percent: decoder.uint64(2)?,
        })
    }

    /// Most recent donors, newest first, at most `limit` entries.
    pub async fn get_recent_donators(&self, limit: u64) -> Result<Vec<Donator>, ContractError> {
        let data = self
            .view_call("getRecentDonators", &[limit as u128])
            .await?;
        let decoder = Decoder::new(&data);
        let array = decoder.tail(decoder.offset(0)?)?;
        let len = array.array_len()?;
        let elements = array.tail(32)?;

        let mut donators = Vec::with_capacity(len);
        for i in 0..len {
            let element = elements.tail(elements.offset(i)?)?;
            donators.push(Donator {
                name: element.string_at(element.offset(0)?)?,
                wallet_address: element.address(1)?,
                amount_wei: element.uint(2)?,
                timestamp: element.uint64(3)?,
            });
        }
        Ok(donators)
    }

    /// Most recent transactions, newest first, at most `limit` entries.
    pub async fn get_recent_transactions(
        &self,
        limit: u64,
    ) -> Result<Vec<ContractTx>, ContractError> {
        let data = self
            .view_call("getRecentTransactions", &[limit as u128])
            .await?;
        let decoder = Decoder::new(&data);
        let array = decoder.tail(decoder.offset(0)?)?;
        let len = array.array_len()?;
        let elements = array.tail(32)?;

        let mut transactions = Vec::with_capacity(len);
        for i in 0..len {
            let element = elements.tail(elements.offset(i)?)?;
            transactions.push(ContractTx {
                value_wei: element.uint(0)?,
                tx_hash: element.string_at(element.offset(1)?)?,
                timestamp: element.uint64(2)?,
                status: element.string_at(element.offset(3)?)?,
            });
        }
        Ok(transactions)
    }

    async fn view_call(&self, name: &str, args: &[u128]) -> Result<Vec<u8>, ContractError> {
        let request = CallRequest {
            to: self.address.clone(),
            data: self.abi.encode_call_uints(name, args)?,
        };
        Ok(self.provider.call(&request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundra_common::MockProvider;

    const TEST_ABI: &str = r#"[
        { "type": "function", "name": "donate", "inputs": [],
          "outputs": [], "stateMutability": "payable" },
        { "type": "function", "name": "getProjectStats", "inputs": [],
          "outputs": [], "stateMutability": "view" },
        { "type": "function", "name": "getRecentDonators",
          "inputs": [{ "name": "limit", "type": "uint256" }],
          "outputs": [], "stateMutability": "view" },
        { "type": "function", "name": "getRecentTransactions",
          "inputs": [{ "name": "limit", "type": "uint256" }],
          "outputs": [], "stateMutability": "view" }
    ]"#;

    const CONTRACT: &str = "0x2222222222222222222222222222222222222222";
    const DONOR: &str = "0x1111111111111111111111111111111111111111";

    fn binding(provider: Arc<MockProvider>) -> ContractBinding {
        let abi = ContractAbi::from_json(TEST_ABI).expect("abi");
        ContractBinding::new(CONTRACT, abi, provider)
    }

    fn push_word_u64(buf: &mut Vec<u8>, value: u64) {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        buf.extend_from_slice(&word);
    }

    fn push_address(buf: &mut Vec<u8>, byte: u8) {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[byte; 20]);
        buf.extend_from_slice(&word);
    }

    fn push_string(buf: &mut Vec<u8>, text: &str) {
        push_word_u64(buf, text.len() as u64);
        let mut chunk = vec![0u8; text.len().div_ceil(32).max(1) * 32];
        chunk[..text.len()].copy_from_slice(text.as_bytes());
        buf.extend_from_slice(&chunk);
    }

    #[tokio::test]
    async fn test_donate_sends_value_with_selector() {
        let provider = Arc::new(MockProvider::new());
        provider.set_next_tx_hash("0xabc");
        let binding = binding(provider.clone());

        let hash = binding.donate(DONOR, 500).await.expect("donate");
        assert_eq!(hash, "0xabc");

        let sent = provider.sent_transactions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, DONOR);
        assert_eq!(sent[0].to, CONTRACT);
        assert_eq!(sent[0].value_wei, 500);
        assert_eq!(sent[0].data, vec![0xed, 0x88, 0xc6, 0x8e]);
    }

    #[tokio::test]
    async fn test_project_stats_decode() {
        let provider = Arc::new(MockProvider::new());
        let mut data = Vec::new();
        push_word_u64(&mut data, 35_000);
        push_word_u64(&mut data, 42);
        push_word_u64(&mut data, 35);
        provider.push_call_result(data);

        let stats = binding(provider).get_project_stats().await.expect("stats");
        assert_eq!(
            stats,
            ProjectStats {
                total_donations_wei: 35_000,
                donators_count: 42,
                progress_percent: 35,
            }
        );
    }

    #[tokio::test]
    async fn test_recent_donators_decode() {
        let provider = Arc::new(MockProvider::new());

        // (string, address, uint256, uint256)[] with two entries.
        let mut element_a = Vec::new();
        push_word_u64(&mut element_a, 0x80); // string offset within tuple
        push_address(&mut element_a, 0xaa);
        push_word_u64(&mut element_a, 1_000);
        push_word_u64(&mut element_a, 1_700_000_000);
        push_string(&mut element_a, "Alice");

        let mut element_b = Vec::new();
        push_word_u64(&mut element_b, 0x80);
        push_address(&mut element_b, 0xbb);
        push_word_u64(&mut element_b, 2_000);
        push_word_u64(&mut element_b, 1_700_000_100);
        push_string(&mut element_b, "Bob");

        let mut data = Vec::new();
        push_word_u64(&mut data, 0x20); // offset of array
        push_word_u64(&mut data, 2); // length
        push_word_u64(&mut data, 0x40); // element 0 offset (after offset words)
        push_word_u64(&mut data, 0x40 + element_a.len() as u64);
        data.extend_from_slice(&element_a);
        data.extend_from_slice(&element_b);
        provider.push_call_result(data);

        let donators = binding(provider)
            .get_recent_donators(5)
            .await
            .expect("donators");
        assert_eq!(donators.len(), 2);
        assert_eq!(donators[0].name, "Alice");
        assert_eq!(donators[0].wallet_address, format!("0x{}", "aa".repeat(20)));
        assert_eq!(donators[0].amount_wei, 1_000);
        assert_eq!(donators[1].name, "Bob");
        assert_eq!(donators[1].timestamp, 1_700_000_100);
    }

    #[tokio::test]
    async fn test_recent_transactions_decode() {
        let provider = Arc::new(MockProvider::new());

        // One (uint256, string, uint256, string) element.
        let mut element = Vec::new();
        push_word_u64(&mut element, 750);
        push_word_u64(&mut element, 0x80); // txHash offset
        push_word_u64(&mut element, 1_700_000_000);
        push_word_u64(&mut element, 0xc0); // status offset
        push_string(&mut element, "0xdeadbeef"); // two words
        push_string(&mut element, "success");

        let mut data = Vec::new();
        push_word_u64(&mut data, 0x20);
        push_word_u64(&mut data, 1);
        push_word_u64(&mut data, 0x20); // element 0 offset
        data.extend_from_slice(&element);
        provider.push_call_result(data);

        let txs = binding(provider)
            .get_recent_transactions(5)
            .await
            .expect("transactions");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].value_wei, 750);
        assert_eq!(txs[0].tx_hash, "0xdeadbeef");
        assert_eq!(txs[0].status, "success");
    }

    #[tokio::test]
    async fn test_view_rejects_corrupt_array_length() {
        let provider = Arc::new(MockProvider::new());

        // Array offset followed by a length word claiming u64::MAX entries.
        let mut data = Vec::new();
        push_word_u64(&mut data, 0x20);
        push_word_u64(&mut data, u64::MAX);
        provider.push_call_result(data);

        let result = binding(provider).get_recent_donators(5).await;
        assert!(matches!(
            result,
            Err(ContractError::Abi(AbiError::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_view_call_propagates_provider_error() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_next("call", ProviderError::Network("rpc down".into()));
        let result = binding(provider).get_project_stats().await;
        assert!(matches!(
            result,
            Err(ContractError::Provider(ProviderError::Network(_)))
        ));
    }
}
