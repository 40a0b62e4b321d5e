//! # Wallet Connector
//!
//! Owns the single process-wide [`WalletSession`] and keeps it consistent
//! with the live provider state and the persisted store. All session
//! mutations go through this type; other components observe it via
//! [`WalletConnector::subscribe`] instead of reading ambient globals.
//!
//! ## Session Flow
//!
//! ```text
//!              connect()                on_accounts_changed([a, ..])
//!  (empty) ───────────────▶ Connected ─────────────────────────────▶ Connected(a)
//!     ▲                        │
//!     │  on_accounts_changed([])│ / disconnect()
//!     └────────────────────────┘
//!
//!  restore_session(): store-only, optimistic; a later provider event
//!  overwrites the restored address entirely.
//! ```
//!
//! ## Persistence Contract
//!
//! - A successful `connect` mirrors the session into the store
//!   (`walletConnected` = "true", `walletAddress` = the address).
//! - A rejected or failed `connect` leaves the store exactly as it was.
//! - An empty `accountsChanged` clears both keys (disconnect semantics)
//!   and never queries a balance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use fundra_common::provider::{ProviderError, WalletProvider};

use crate::store::{SessionStore, StoreError, KEY_ADDRESS, KEY_CONNECTED};

// ════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════

/// The one authorized account this process tracks (single-account model).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    /// 0x-prefixed 20-byte account address.
    pub address: String,
    /// Chain id, when known. `None` after an optimistic restore.
    pub chain_id: Option<u64>,
    /// Always true while the session exists.
    pub connected: bool,
}

/// Session change notifications for observers (UI, page controllers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established (connect or restore).
    Connected { address: String },
    /// The session was cleared.
    Disconnected,
    /// The provider switched to a different account.
    AccountChanged { address: String },
    /// The provider switched networks; contract bindings are stale.
    ChainChanged { chain_id: u64 },
}

/// Errors from connector operations.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The provider granted access but returned no accounts.
    #[error("provider returned no accounts")]
    NoAccounts,

    /// An operation that needs a session was called without one.
    #[error("wallet not connected")]
    NotConnected,
}

// ════════════════════════════════════════════════════════════════════════════
// CONNECTOR
// ════════════════════════════════════════════════════════════════════════════

/// Owner of the process-wide wallet session.
pub struct WalletConnector {
    provider: Arc<dyn WalletProvider>,
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<WalletSession>>,
    /// Bumped on every chain change; observers holding contract bindings
    /// compare epochs and rebuild when stale (the page-reload analogue).
    epoch: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl WalletConnector {
    pub fn new(provider: Arc<dyn WalletProvider>, store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            provider,
            store,
            session: RwLock::new(None),
            epoch: AtomicU64::new(0),
            events,
        }
    }

    /// Request account access from the provider and establish a session.
    ///
    /// The first returned account becomes the session address. On success
    /// the session is mirrored into the store; on any failure (including a
    /// user rejection) neither the session nor the store is touched.
    pub async fn connect(&self) -> Result<WalletSession, WalletError> {
        let accounts = self.provider.request_accounts().await?;
        let address = accounts.first().cloned().ok_or(WalletError::NoAccounts)?;

        // Best-effort: a session without a chain id is still usable.
        let chain_id = match self.provider.chain_id().await {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(error = %e, "chain id query failed during connect");
                None
            }
        };

        let session = WalletSession {
            address: address.clone(),
            chain_id,
            connected: true,
        };
        self.store.set(KEY_CONNECTED, "true")?;
        self.store.set(KEY_ADDRESS, &address)?;
        *self.session.write() = Some(session.clone());

        info!(address = %address, "wallet connected");
        let _ = self.events.send(SessionEvent::Connected { address });
        Ok(session)
    }

    /// Optimistic restore from the persisted store, without a provider call.
    ///
    /// Does not guarantee the address is still authorized; a provider-driven
    /// `accountsChanged` will correct it.
    pub fn restore_session(&self) -> Result<Option<WalletSession>, WalletError> {
        let connected = self.store.get(KEY_CONNECTED)?;
        let address = self.store.get(KEY_ADDRESS)?;
        let (Some(flag), Some(address)) = (connected, address) else {
            return Ok(None);
        };
        if flag != "true" {
            return Ok(None);
        }

        let session = WalletSession {
            address: address.clone(),
            chain_id: None,
            connected: true,
        };
        *self.session.write() = Some(session.clone());
        debug!(address = %address, "session restored from store");
        let _ = self.events.send(SessionEvent::Connected { address });
        Ok(Some(session))
    }

    /// Clear the session and the persisted keys.
    pub fn disconnect(&self) -> Result<(), WalletError> {
        self.store.remove(KEY_CONNECTED)?;
        self.store.remove(KEY_ADDRESS)?;
        *self.session.write() = None;
        info!("wallet disconnected");
        let _ = self.events.send(SessionEvent::Disconnected);
        Ok(())
    }

    /// Provider-driven account change notification.
    ///
    /// An empty list means the user disconnected every account; otherwise
    /// the first address replaces the current session entirely.
    pub fn on_accounts_changed(&self, accounts: &[String]) -> Result<(), WalletError> {
        let Some(address) = accounts.first() else {
            return self.disconnect();
        };

        let chain_id = self.session.read().as_ref().and_then(|s| s.chain_id);
        self.store.set(KEY_CONNECTED, "true")?;
        self.store.set(KEY_ADDRESS, address)?;
        *self.session.write() = Some(WalletSession {
            address: address.clone(),
            chain_id,
            connected: true,
        });
        info!(address = %address, "active account changed");
        let _ = self.events.send(SessionEvent::AccountChanged {
            address: address.clone(),
        });
        Ok(())
    }

    /// Provider-driven network change notification.
    ///
    /// Bumps the binding epoch: every contract binding created before this
    /// call is stale and must be rebuilt against the new chain.
    pub fn on_chain_changed(&self, chain_id: u64) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(session) = self.session.write().as_mut() {
            session.chain_id = Some(chain_id);
        }
        warn!(chain_id, "chain changed, contract bindings invalidated");
        let _ = self.events.send(SessionEvent::ChainChanged { chain_id });
    }

    /// Native-currency balance of the session address, in wei.
    pub async fn get_balance(&self) -> Result<u128, WalletError> {
        let address = self
            .session
            .read()
            .as_ref()
            .map(|s| s.address.clone())
            .ok_or(WalletError::NotConnected)?;
        Ok(self.provider.get_balance(&address).await?)
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Option<WalletSession> {
        self.session.read().clone()
    }

    /// Current binding epoch; changes whenever the chain changes.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Subscribe to session change events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use fundra_common::MockProvider;

    const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn setup() -> (Arc<MockProvider>, Arc<MemoryStore>, WalletConnector) {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemoryStore::new());
        let connector = WalletConnector::new(provider.clone(), store.clone());
        (provider, store, connector)
    }

    #[tokio::test]
    async fn test_connect_establishes_and_persists_session() {
        let (provider, store, connector) = setup();
        provider.set_accounts(&[ADDR_A]);
        provider.set_chain_id(31337);

        let session = connector.connect().await.expect("connect");
        assert_eq!(session.address, ADDR_A);
        assert_eq!(session.chain_id, Some(31337));
        assert!(session.connected);
        assert_eq!(store.get(KEY_CONNECTED).unwrap().as_deref(), Some("true"));
        assert_eq!(store.get(KEY_ADDRESS).unwrap().as_deref(), Some(ADDR_A));
    }

    #[tokio::test]
    async fn test_rejected_connect_leaves_store_unchanged() {
        let (provider, store, connector) = setup();
        store.set(KEY_CONNECTED, "true").unwrap();
        store.set(KEY_ADDRESS, ADDR_B).unwrap();
        let before = store.snapshot();

        provider.fail_next("request_accounts", ProviderError::UserRejected);
        let result = connector.connect().await;
        assert!(matches!(
            result,
            Err(WalletError::Provider(ProviderError::UserRejected))
        ));
        assert_eq!(store.snapshot(), before);
        assert_eq!(connector.session(), None);
    }

    #[tokio::test]
    async fn test_connect_with_no_accounts_fails_cleanly() {
        let (_provider, store, connector) = setup();
        let result = connector.connect().await;
        assert!(matches!(result, Err(WalletError::NoAccounts)));
        assert_eq!(store.get(KEY_CONNECTED).unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_accounts_changed_clears_without_balance_query() {
        let (provider, store, connector) = setup();
        provider.set_accounts(&[ADDR_A]);
        connector.connect().await.expect("connect");

        connector.on_accounts_changed(&[]).expect("disconnect");
        assert_eq!(connector.session(), None);
        assert_eq!(store.get(KEY_CONNECTED).unwrap(), None);
        assert_eq!(store.get(KEY_ADDRESS).unwrap(), None);
        assert_eq!(provider.balance_calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_then_accounts_changed_overwrites_fully() {
        let (_provider, store, connector) = setup();
        store.set(KEY_CONNECTED, "true").unwrap();
        store.set(KEY_ADDRESS, ADDR_A).unwrap();

        let restored = connector.restore_session().expect("restore");
        assert_eq!(restored.map(|s| s.address).as_deref(), Some(ADDR_A));

        connector
            .on_accounts_changed(&[ADDR_B.to_string()])
            .expect("switch");
        let session = connector.session().expect("session");
        assert_eq!(session.address, ADDR_B);
        assert_eq!(store.get(KEY_ADDRESS).unwrap().as_deref(), Some(ADDR_B));
    }

    #[tokio::test]
    async fn test_restore_without_flag_is_none() {
        let (_provider, store, connector) = setup();
        store.set(KEY_ADDRESS, ADDR_A).unwrap();
        assert!(connector.restore_session().expect("restore").is_none());
    }

    #[tokio::test]
    async fn test_chain_changed_bumps_epoch_and_notifies() {
        let (provider, _store, connector) = setup();
        provider.set_accounts(&[ADDR_A]);
        connector.connect().await.expect("connect");
        let mut events = connector.subscribe();

        let epoch_before = connector.epoch();
        connector.on_chain_changed(11155111);
        assert_eq!(connector.epoch(), epoch_before + 1);
        assert_eq!(
            connector.session().and_then(|s| s.chain_id),
            Some(11155111)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::ChainChanged { chain_id: 11155111 }
        );
    }

    #[tokio::test]
    async fn test_balance_requires_session() {
        let (provider, _store, connector) = setup();
        assert!(matches!(
            connector.get_balance().await,
            Err(WalletError::NotConnected)
        ));

        provider.set_accounts(&[ADDR_A]);
        provider.set_balance(ADDR_A, 7);
        connector.connect().await.expect("connect");
        assert_eq!(connector.get_balance().await.unwrap(), 7);
    }
}
