//! Mock Wallet Provider for Testing
//!
//! Fully in-memory [`WalletProvider`] implementation. No network calls,
//! deterministic behavior, scripted responses, per-method failure injection,
//! and call recording so tests can assert what the workflow did (and did
//! not) invoke.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::provider::{CallRequest, ProviderError, TxReceipt, TxRequest, WalletProvider};

#[derive(Default)]
struct Inner {
    accounts: Vec<String>,
    chain_id: u64,
    balances: HashMap<String, u128>,
    gas_price: u128,
    gas_estimate: u64,
    next_tx_hash: String,
    /// Successive results for `transaction_receipt`; `None` simulates a
    /// still-pending transaction. The last entry repeats once drained.
    receipts: VecDeque<Option<TxReceipt>>,
    /// Successive return payloads for `call`, in request order.
    call_results: VecDeque<Vec<u8>>,
    block_number: u64,
    /// One-shot failures keyed by method name.
    failures: HashMap<&'static str, ProviderError>,

    // Recording.
    balance_calls: u32,
    send_calls: u32,
    call_calls: u32,
    sent: Vec<TxRequest>,
}

/// Scripted in-memory wallet provider.
pub struct MockProvider {
    inner: Mutex<Inner>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Empty provider: no accounts, zero balances, chain id 1.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                chain_id: 1,
                next_tx_hash: "0xmock".to_string(),
                block_number: 1,
                ..Inner::default()
            }),
        }
    }

    // ── scripting ────────────────────────────────────────────────────────

    pub fn set_accounts(&self, accounts: &[&str]) {
        self.inner.lock().accounts = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.inner.lock().chain_id = chain_id;
    }

    pub fn set_balance(&self, address: &str, wei: u128) {
        self.inner.lock().balances.insert(address.to_string(), wei);
    }

    pub fn set_gas(&self, estimate: u64, price_wei: u128) {
        let mut inner = self.inner.lock();
        inner.gas_estimate = estimate;
        inner.gas_price = price_wei;
    }

    pub fn set_next_tx_hash(&self, hash: &str) {
        self.inner.lock().next_tx_hash = hash.to_string();
    }

    pub fn set_block_number(&self, number: u64) {
        self.inner.lock().block_number = number;
    }

    /// Queue a receipt poll result. `None` means "still pending".
    pub fn push_receipt(&self, receipt: Option<TxReceipt>) {
        self.inner.lock().receipts.push_back(receipt);
    }

    /// Queue raw return data for the next `call`.
    pub fn push_call_result(&self, data: Vec<u8>) {
        self.inner.lock().call_results.push_back(data);
    }

    /// Make the next invocation of `method` fail with `error`.
    pub fn fail_next(&self, method: &'static str, error: ProviderError) {
        self.inner.lock().failures.insert(method, error);
    }

    // ── recording ────────────────────────────────────────────────────────

    pub fn balance_calls(&self) -> u32 {
        self.inner.lock().balance_calls
    }

    pub fn send_calls(&self) -> u32 {
        self.inner.lock().send_calls
    }

    pub fn call_calls(&self) -> u32 {
        self.inner.lock().call_calls
    }

    pub fn sent_transactions(&self) -> Vec<TxRequest> {
        self.inner.lock().sent.clone()
    }

    fn take_failure(&self, method: &'static str) -> Option<ProviderError> {
        self.inner.lock().failures.remove(method)
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        if let Some(err) = self.take_failure("request_accounts") {
            return Err(err);
        }
        Ok(self.inner.lock().accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        if let Some(err) = self.take_failure("accounts") {
            return Err(err);
        }
        Ok(self.inner.lock().accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        if let Some(err) = self.take_failure("chain_id") {
            return Err(err);
        }
        Ok(self.inner.lock().chain_id)
    }

    async fn get_balance(&self, address: &str) -> Result<u128, ProviderError> {
        if let Some(err) = self.take_failure("get_balance") {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        inner.balance_calls += 1;
        Ok(inner.balances.get(address).copied().unwrap_or(0))
    }

    async fn gas_price(&self) -> Result<u128, ProviderError> {
        if let Some(err) = self.take_failure("gas_price") {
            return Err(err);
        }
        Ok(self.inner.lock().gas_price)
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64, ProviderError> {
        if let Some(err) = self.take_failure("estimate_gas") {
            return Err(err);
        }
        Ok(self.inner.lock().gas_estimate)
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<String, ProviderError> {
        if let Some(err) = self.take_failure("send_transaction") {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        inner.send_calls += 1;
        inner.sent.push(tx.clone());
        Ok(inner.next_tx_hash.clone())
    }

    async fn call(&self, _req: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        if let Some(err) = self.take_failure("call") {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        inner.call_calls += 1;
        inner
            .call_results
            .pop_front()
            .ok_or_else(|| ProviderError::InvalidResponse("no scripted call result".to_string()))
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TxReceipt>, ProviderError> {
        if let Some(err) = self.take_failure("transaction_receipt") {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        match inner.receipts.len() {
            0 => Ok(None),
            // Keep repeating the final scripted answer.
            1 => Ok(inner.receipts.front().cloned().flatten().map(|mut r| {
                if r.tx_hash.is_empty() {
                    r.tx_hash = tx_hash.to_string();
                }
                r
            })),
            _ => Ok(inner.receipts.pop_front().flatten()),
        }
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        if let Some(err) = self.take_failure("block_number") {
            return Err(err);
        }
        Ok(self.inner.lock().block_number)
    }
}
