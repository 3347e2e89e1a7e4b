// common/src/stores/memory.rs
//! In-process stand-ins for the remote stores, used for local development
//! (`stores.backend = "memory"`) and in tests.
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{AddressStore, SessionStore};
use crate::clock::Clock;
use crate::error::RemoteError;
use crate::models::{AddressRecord, AddressSubmission, SessionVerdict, UserId};

/// Session store that grants `ttl_secs` from the first registration
pub struct MemorySessionStore {
    clock: Arc<dyn Clock>,
    ttl_secs: i64,
    // (psid, issue timestamp) -> confirmed expiry
    sessions: DashMap<(String, i64), i64>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl_secs: i64) -> Self {
        Self {
            clock,
            ttl_secs,
            sessions: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn verdict(&self, expiry: i64) -> SessionVerdict {
        SessionVerdict {
            is_expired: self.clock.now() >= expiry,
            timestamp: Some(expiry),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn upsert_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
        let expiry = *self
            .sessions
            .entry((user_id.to_string(), issued_at))
            .or_insert(issued_at + self.ttl_secs);
        Ok(self.verdict(expiry))
    }

    async fn check_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
        let key = (user_id.to_string(), issued_at);
        match self.sessions.get(&key).map(|entry| *entry.value()) {
            Some(expiry) => Ok(self.verdict(expiry)),
            None => Ok(SessionVerdict {
                is_expired: true,
                timestamp: None,
            }),
        }
    }
}

/// Address store keeping submissions in memory
#[derive(Default)]
pub struct MemoryAddressStore {
    records: DashMap<(String, i64), AddressSubmission>,
}

impl MemoryAddressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &UserId, issued_at: i64) -> Option<AddressSubmission> {
        self.records
            .get(&(user_id.to_string(), issued_at))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn fetch_address(&self, user_id: &UserId, issued_at: i64) -> Result<Option<AddressRecord>, RemoteError> {
        Ok(self.get(user_id, issued_at).map(|submission| AddressRecord {
            psid: Some(submission.psid),
            timestamp: Some(submission.timestamp),
            form: submission.form,
        }))
    }

    async fn submit_address(&self, submission: &AddressSubmission) -> Result<(), RemoteError> {
        self.records.insert(
            (submission.psid.clone(), submission.timestamp),
            submission.clone(),
        );
        Ok(())
    }
}
