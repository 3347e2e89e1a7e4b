// web-server/src/page_registry.rs
use common::identity::{ready_channel, PlatformNotifier, PlatformReady};
use common::{Clock, PageSession};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::utils::token::create_page_id;

/// One webview page load held by the server
pub struct PageEntry {
    created_at: i64,
    session: Arc<Mutex<PageSession>>,
    // taken by the single platform context report
    notifier: Option<PlatformNotifier>,
    ready: PlatformReady,
}

/// What a handler needs to drive a page
#[derive(Clone)]
pub struct PageHandle {
    pub session: Arc<Mutex<PageSession>>,
    pub ready: PlatformReady,
}

#[derive(Debug, PartialEq, Eq)]
pub enum NotifyError {
    UnknownPage,
    AlreadyReported,
}

/// Page loads keyed by page id
pub struct PageRegistry {
    pages: Arc<DashMap<String, PageEntry>>,
    clock: Arc<dyn Clock>,
    // Page TTL in seconds
    page_ttl: i64,
}

impl PageRegistry {
    pub fn new(clock: Arc<dyn Clock>, page_ttl: i64) -> Self {
        Self {
            pages: Arc::new(DashMap::new()),
            clock,
            page_ttl,
        }
    }

    pub fn page_ttl(&self) -> i64 {
        self.page_ttl
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Register a new page load and return its id
    pub fn create(&self, session: PageSession) -> String {
        let page_id = create_page_id();
        let (notifier, ready) = ready_channel();

        self.pages.insert(
            page_id.clone(),
            PageEntry {
                created_at: self.clock.now(),
                session: Arc::new(Mutex::new(session)),
                notifier: Some(notifier),
                ready,
            },
        );

        tracing::debug!("Registered page load, {} active", self.len());
        page_id
    }

    pub fn get(&self, page_id: &str) -> Option<PageHandle> {
        self.pages.get(page_id).map(|entry| PageHandle {
            session: entry.session.clone(),
            ready: entry.ready.clone(),
        })
    }

    /// Hand out the page's notifier; only the first caller gets it
    pub fn take_notifier(&self, page_id: &str) -> Result<PlatformNotifier, NotifyError> {
        let mut entry = self.pages.get_mut(page_id).ok_or(NotifyError::UnknownPage)?;
        entry.notifier.take().ok_or(NotifyError::AlreadyReported)
    }

    /// Drop page loads older than the TTL
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.pages.len();
        self.pages.retain(|_, page| now - page.created_at <= self.page_ttl);
        before.saturating_sub(self.pages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::stores::{MemoryAddressStore, MemorySessionStore};
    use common::{ManualClock, SessionValidator};

    const T0: i64 = 1_700_000_000;

    fn page(clock: &Arc<ManualClock>) -> PageSession {
        let validator = SessionValidator::new(
            Arc::new(MemorySessionStore::new(clock.clone(), 1200)),
            clock.clone(),
            20,
        );
        PageSession::new(validator, Arc::new(MemoryAddressStore::new()))
    }

    #[test]
    fn test_create_and_get() {
        let clock = Arc::new(ManualClock::new(T0));
        let registry = PageRegistry::new(clock.clone(), 3600);

        let a = registry.create(page(&clock));
        let b = registry.create(page(&clock));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&a).is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_notifier_taken_once() {
        let clock = Arc::new(ManualClock::new(T0));
        let registry = PageRegistry::new(clock.clone(), 3600);
        let id = registry.create(page(&clock));

        assert!(registry.take_notifier(&id).is_ok());
        assert_eq!(registry.take_notifier(&id).unwrap_err(), NotifyError::AlreadyReported);
        assert_eq!(registry.take_notifier("missing").unwrap_err(), NotifyError::UnknownPage);
    }

    #[test]
    fn test_cleanup_drops_old_pages() {
        let clock = Arc::new(ManualClock::new(T0));
        let registry = PageRegistry::new(clock.clone(), 3600);
        let old = registry.create(page(&clock));

        clock.advance(1800);
        let fresh = registry.create(page(&clock));

        clock.advance(1801);
        assert_eq!(registry.cleanup_expired(), 1);
        assert!(registry.get(&old).is_none());
        assert!(registry.get(&fresh).is_some());
    }
}
