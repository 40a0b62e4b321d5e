//! On-chain donation support: ABI encoding, the platform contract
//! binding, and the donation workflow state machine.
//!
//! The split mirrors how a donation reaches the chain:
//!
//! ```text
//! workflow (lifecycle + checks)
//!    │ donate_request / views
//!    ▼
//! contract (typed binding, fixed address + ABI)
//!    │ selectors + argument words
//!    ▼
//! abi (Keccak-256 selectors, word codec)
//! ```
//!
//! Everything network-facing goes through the [`WalletProvider`] trait
//! from `fundra-common`, so each layer tests against the mock provider.
//!
//! [`WalletProvider`]: fundra_common::WalletProvider

pub mod abi;
pub mod contract;
pub mod workflow;

pub use abi::{AbiError, ContractAbi};
pub use contract::{ContractBinding, ContractError, ContractTx, Donator, ProjectStats};
pub use workflow::{
    DonationError, DonationReceipt, DonationState, DonationWorkflow, ReceiptStatus,
};
