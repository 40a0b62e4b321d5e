//! # Donation Workflow
//!
//! Turns a user-entered amount into a confirmed on-chain donation, with
//! pre-flight affordability checks and explicit lifecycle state.
//!
//! ## State Flow
//!
//! ```text
//! Idle ──select_amount──▶ AmountSelected ──donate──▶ Estimating
//!                                                        │
//!                            balance < amount + gas*price│
//!                    ┌───────────────────────────────────┤
//!                    ▼                                   ▼
//!            InsufficientFunds                      Submitting
//!              (terminal)                                │
//!                                                        ▼
//!                                                     Pending ──▶ Confirmed
//!                                                        │        (terminal)
//!                                                        └──────▶ Failed
//!                                                                 (terminal)
//! ```
//!
//! ## Semantics
//!
//! | Rule            | Behavior                                             |
//! |-----------------|------------------------------------------------------|
//! | Affordability   | InsufficientFunds iff `balance < amount + gas*price`; |
//! |                 | equality proceeds to Submitting                      |
//! | Re-entrancy     | one attempt in flight per workflow instance          |
//! | Pending         | no local timeout; an unresponsive network keeps the  |
//! |                 | attempt Pending and observable, never failed         |
//! | Confirmed       | the three read views are refreshed exactly once,     |
//! |                 | best-effort                                          |
//! | Retry           | user-initiated only; every error leaves the session  |
//! |                 | and binding intact                                   |
//!
//! Cancellation is only possible before Submitting: once broadcast, the
//! network owns the transaction and the workflow can only observe it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use fundra_common::provider::{ProviderError, WalletProvider};
use fundra_common::units;

use crate::abi::AbiError;
use crate::contract::{ContractBinding, ContractError};

/// Entries requested from each read view after a confirmed donation,
/// matching the lists the project page renders.
const VIEW_REFRESH_LIMIT: u64 = 5;

// ════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ════════════════════════════════════════════════════════════════════════════

/// User-facing donation failures. All recoverable: the user may retry and
/// neither the session nor the contract binding is left corrupted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DonationError {
    #[error("wallet provider unavailable")]
    ProviderUnavailable,

    #[error("user rejected the transaction")]
    UserRejected,

    /// The entered amount is not a positive decimal.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Balance does not cover amount plus network fee.
    #[error("insufficient funds: need {required_wei} wei, have {available_wei} wei (short {shortfall_wei} wei)")]
    InsufficientFunds {
        required_wei: u128,
        available_wei: u128,
        shortfall_wei: u128,
    },

    #[error("network error: {0}")]
    Network(String),

    /// The transaction reverted on-chain; message forwarded when available.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// Another donation attempt is already in flight on this workflow.
    #[error("a donation attempt is already in progress")]
    Busy,

    /// Malformed ABI data or provider response; not user-correctable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for DonationError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Unavailable => DonationError::ProviderUnavailable,
            ProviderError::UserRejected => DonationError::UserRejected,
            ProviderError::Reverted(msg) => DonationError::Reverted(msg),
            ProviderError::Network(msg) => DonationError::Network(msg),
            ProviderError::Rpc { code, message } => {
                DonationError::Network(format!("rpc error {}: {}", code, message))
            }
            ProviderError::InvalidResponse(msg) => DonationError::Internal(msg),
        }
    }
}

impl From<ContractError> for DonationError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::Provider(p) => p.into(),
            ContractError::Abi(a) => DonationError::Internal(a.to_string()),
        }
    }
}

impl From<AbiError> for DonationError {
    fn from(e: AbiError) -> Self {
        DonationError::Internal(e.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// STATE
// ════════════════════════════════════════════════════════════════════════════

/// Lifecycle of one donation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonationState {
    /// No attempt in progress.
    Idle,
    /// An amount was chosen and validated.
    AmountSelected { amount_wei: u128 },
    /// Querying gas price, gas estimate, and balance.
    Estimating { amount_wei: u128 },
    /// Terminal for this attempt: the total cost exceeds the balance.
    InsufficientFunds {
        required_wei: u128,
        available_wei: u128,
        shortfall_wei: u128,
    },
    /// Signing and broadcasting.
    Submitting { amount_wei: u128 },
    /// Accepted by the network, awaiting confirmation. May last
    /// indefinitely; this is an open-ended wait, not a failure.
    Pending { tx_hash: String },
    /// Terminal success.
    Confirmed { tx_hash: String, confirmations: u64 },
    /// Terminal failure.
    Failed {
        tx_hash: Option<String>,
        error: DonationError,
    },
}

/// Status of a submitted donation, derived from the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Observable outcome of a submitted donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationReceipt {
    pub tx_hash: String,
    pub status: ReceiptStatus,
    pub block_confirmations: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// WORKFLOW
// ════════════════════════════════════════════════════════════════════════════

/// Drives a single donation dialog's attempts against a bound contract.
pub struct DonationWorkflow {
    contract: Arc<ContractBinding>,
    provider: Arc<dyn WalletProvider>,
    state: watch::Sender<DonationState>,
    in_flight: AtomicBool,
    poll_interval: Duration,
}

/// Releases the in-flight flag when an attempt leaves the workflow,
/// whichever path it takes out.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DonationWorkflow {
    pub fn new(contract: Arc<ContractBinding>, provider: Arc<dyn WalletProvider>) -> Self {
        let (state, _) = watch::channel(DonationState::Idle);
        Self {
            contract,
            provider,
            state,
            in_flight: AtomicBool::new(false),
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Override the receipt poll interval (tests use a short one).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Current state snapshot.
    pub fn state(&self) -> DonationState {
        self.state.borrow().clone()
    }

    /// Watch state transitions as they happen.
    pub fn watch(&self) -> watch::Receiver<DonationState> {
        self.state.subscribe()
    }

    /// Receipt view of the current attempt, if one was broadcast.
    pub fn receipt(&self) -> Option<DonationReceipt> {
        match self.state() {
            DonationState::Pending { tx_hash } => Some(DonationReceipt {
                tx_hash,
                status: ReceiptStatus::Pending,
                block_confirmations: 0,
            }),
            DonationState::Confirmed {
                tx_hash,
                confirmations,
            } => Some(DonationReceipt {
                tx_hash,
                status: ReceiptStatus::Confirmed,
                block_confirmations: confirmations,
            }),
            DonationState::Failed {
                tx_hash: Some(tx_hash),
                ..
            } => Some(DonationReceipt {
                tx_hash,
                status: ReceiptStatus::Failed,
                block_confirmations: 0,
            }),
            _ => None,
        }
    }

    fn set_state(&self, next: DonationState) {
        debug!(state = ?next, "donation state");
        self.state.send_replace(next);
    }

    /// Validate and select a donation amount (decimal ETH string).
    ///
    /// Refused while an attempt is in flight or awaiting confirmation.
    pub fn select_amount(&self, input: &str) -> Result<u128, DonationError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(DonationError::Busy);
        }
        if matches!(
            self.state(),
            DonationState::Submitting { .. } | DonationState::Pending { .. }
        ) {
            return Err(DonationError::Busy);
        }

        let amount_wei =
            units::parse_eth(input).map_err(|e| DonationError::InvalidAmount(e.to_string()))?;
        if amount_wei == 0 {
            return Err(DonationError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        self.set_state(DonationState::AmountSelected { amount_wei });
        Ok(amount_wei)
    }

    /// Discard local attempt state. Possible in every state except
    /// Submitting and Pending; once broadcast, the transaction cannot be
    /// cancelled, only observed.
    pub fn cancel(&self) -> bool {
        if self.in_flight.load(Ordering::SeqCst) {
            return false;
        }
        match self.state() {
            DonationState::Submitting { .. } | DonationState::Pending { .. } => false,
            _ => {
                self.set_state(DonationState::Idle);
                true
            }
        }
    }

    /// Run the selected amount through estimation, affordability check,
    /// submission, and confirmation.
    ///
    /// One attempt per workflow instance may be in flight; a second call
    /// while the first is running fails with [`DonationError::Busy`] and
    /// sends nothing.
    pub async fn donate(&self, from: &str) -> Result<DonationReceipt, DonationError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DonationError::Busy);
        }
        let _guard = FlightGuard(&self.in_flight);

        let amount_wei = match self.state() {
            DonationState::AmountSelected { amount_wei } => amount_wei,
            DonationState::Pending { .. } => return Err(DonationError::Busy),
            _ => {
                return Err(DonationError::InvalidAmount(
                    "no amount selected".to_string(),
                ))
            }
        };

        // ── Estimating ───────────────────────────────────────────────────
        self.set_state(DonationState::Estimating { amount_wei });
        let tx = self.contract.donate_request(from, amount_wei)?;

        let gas_price = match self.provider.gas_price().await {
            Ok(v) => v,
            Err(e) => return Err(self.fail(None, e.into())),
        };
        let gas_estimate = match self.provider.estimate_gas(&tx).await {
            Ok(v) => v,
            Err(e) => return Err(self.fail(None, e.into())),
        };
        let balance = match self.provider.get_balance(from).await {
            Ok(v) => v,
            Err(e) => return Err(self.fail(None, e.into())),
        };

        // ── Balance check ────────────────────────────────────────────────
        let required_wei = units::total_cost(amount_wei, gas_estimate, gas_price)
            .map_err(|e| self.fail(None, DonationError::Internal(e.to_string())))?;
        if balance < required_wei {
            let error = DonationError::InsufficientFunds {
                required_wei,
                available_wei: balance,
                shortfall_wei: required_wei - balance,
            };
            info!(
                required = %units::format_wei(required_wei),
                available = %units::format_wei(balance),
                "donation unaffordable"
            );
            self.set_state(DonationState::InsufficientFunds {
                required_wei,
                available_wei: balance,
                shortfall_wei: required_wei - balance,
            });
            return Err(error);
        }

        // ── Submitting ───────────────────────────────────────────────────
        self.set_state(DonationState::Submitting { amount_wei });
        let tx_hash = match self.provider.send_transaction(&tx).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(None, e.into())),
        };
        info!(tx_hash = %tx_hash, amount = %units::format_wei(amount_wei), "donation broadcast");
        self.set_state(DonationState::Pending {
            tx_hash: tx_hash.clone(),
        });

        self.observe_outcome(tx_hash).await
    }

    /// Resume observing a Pending attempt (after e.g. a transport error
    /// interrupted polling). Never re-broadcasts.
    pub async fn await_outcome(&self) -> Result<DonationReceipt, DonationError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DonationError::Busy);
        }
        let _guard = FlightGuard(&self.in_flight);

        match self.state() {
            DonationState::Pending { tx_hash } => self.observe_outcome(tx_hash).await,
            _ => Err(DonationError::Internal(
                "no pending transaction to observe".to_string(),
            )),
        }
    }

    /// Poll for the receipt until the network answers. A transport error
    /// leaves the state Pending and returns; the caller may resume with
    /// [`Self::await_outcome`]. There is no local timeout.
    async fn observe_outcome(&self, tx_hash: String) -> Result<DonationReceipt, DonationError> {
        let receipt = loop {
            match self.provider.transaction_receipt(&tx_hash).await {
                Ok(Some(receipt)) => break receipt,
                Ok(None) => sleep(self.poll_interval).await,
                Err(e) => return Err(e.into()),
            }
        };

        if !receipt.status {
            let error = DonationError::Reverted("transaction reverted on-chain".to_string());
            return Err(self.fail(Some(tx_hash), error));
        }

        let confirmations = match self.provider.block_number().await {
            Ok(head) => head.saturating_sub(receipt.block_number) + 1,
            Err(e) => {
                warn!(error = %e, "confirmation count unavailable, assuming inclusion only");
                1
            }
        };
        info!(tx_hash = %tx_hash, confirmations, "donation confirmed");
        self.set_state(DonationState::Confirmed {
            tx_hash: tx_hash.clone(),
            confirmations,
        });

        // Best-effort: a failed refresh never reverts a confirmed donation.
        self.refresh_views().await;

        Ok(DonationReceipt {
            tx_hash,
            status: ReceiptStatus::Confirmed,
            block_confirmations: confirmations,
        })
    }

    /// Re-query the three read views once after a confirmed donation.
    async fn refresh_views(&self) {
        if let Err(e) = self.contract.get_project_stats().await {
            warn!(error = %e, "stats refresh failed");
        }
        if let Err(e) = self.contract.get_recent_donators(VIEW_REFRESH_LIMIT).await {
            warn!(error = %e, "donator list refresh failed");
        }
        if let Err(e) = self
            .contract
            .get_recent_transactions(VIEW_REFRESH_LIMIT)
            .await
        {
            warn!(error = %e, "transaction list refresh failed");
        }
    }

    /// Record a terminal failure and hand the error back.
    fn fail(&self, tx_hash: Option<String>, error: DonationError) -> DonationError {
        warn!(error = %error, "donation attempt failed");
        self.set_state(DonationState::Failed {
            tx_hash,
            error: error.clone(),
        });
        error
    }
}
