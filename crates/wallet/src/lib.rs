//! # Fundra Wallet Crate
//!
//! Wallet connection tracking for the donation client: the single
//! process-wide session, its persisted mirror, and provider event handling.
//!
//! ## Modules
//! - `connector`: [`WalletConnector`], the sole owner of the session
//! - `store`: [`SessionStore`] trait with file and in-memory backends

pub mod connector;
pub mod store;

pub use connector::{SessionEvent, WalletConnector, WalletError, WalletSession};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError, KEY_ADDRESS, KEY_CONNECTED};
