// web-server/src/state.rs
use std::sync::Arc;
use std::time::Duration;

use common::identity::{IdentityResolver, PlatformReady};
use common::stores::{
    AddressStore, HttpAddressStore, HttpSessionStore, MemoryAddressStore, MemorySessionStore,
    SessionStore,
};
use common::{
    Clock, Config, PageSession, RemoteError, SessionValidator, StoreBackend, TokenCodec, TokenError,
};
use thiserror::Error;

use crate::page_registry::PageRegistry;

/// Why the server could not be wired up
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("token codec: {0}")]
    Token(#[from] TokenError),
    #[error("store client: {0}")]
    Store(#[from] RemoteError),
}

/// Shared application state handed to every handler
pub struct AppState {
    pub config: Config,
    pub codec: Arc<TokenCodec>,
    pub clock: Arc<dyn Clock>,
    pub session_store: Arc<dyn SessionStore>,
    pub address_store: Arc<dyn AddressStore>,
    pub registry: PageRegistry,
}

impl AppState {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        let codec = Arc::new(TokenCodec::from_config(&config.token)?);

        let (session_store, address_store): (Arc<dyn SessionStore>, Arc<dyn AddressStore>) =
            match config.stores.backend {
                StoreBackend::Http => {
                    let timeout = Duration::from_secs(config.stores.request_timeout_secs);
                    (
                        Arc::new(HttpSessionStore::new(&config.stores.session_store_url, timeout)?),
                        Arc::new(HttpAddressStore::new(&config.stores.address_store_url, timeout)?),
                    )
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory stores, sessions and addresses are not persisted");
                    (
                        Arc::new(MemorySessionStore::new(
                            clock.clone(),
                            config.session.timeout_minutes * 60,
                        )),
                        Arc::new(MemoryAddressStore::new()),
                    )
                }
            };

        let registry = PageRegistry::new(clock.clone(), config.session.page_ttl_secs);

        Ok(Self {
            config,
            codec,
            clock,
            session_store,
            address_store,
            registry,
        })
    }

    /// Fresh page session with its own empty expiry cache
    pub fn new_page(&self) -> PageSession {
        let validator = SessionValidator::new(
            self.session_store.clone(),
            self.clock.clone(),
            self.config.session.timeout_minutes,
        );
        PageSession::new(validator, self.address_store.clone())
    }

    pub fn resolver(&self, ready: PlatformReady) -> IdentityResolver {
        IdentityResolver::from_config(&self.config.platform, self.codec.clone(), ready)
    }
}
