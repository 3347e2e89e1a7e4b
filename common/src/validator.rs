// common/src/validator.rs
//! Session validity for one page load.
//!
//! Local checks are pure time arithmetic on the issue timestamp. The session
//! store is authoritative; when it cannot be reached the session counts as
//! expired. The last expiry the store confirmed is kept for the lifetime of
//! the validator and is the only thing a submission is judged by.
use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::error::LocalValidityError;
use crate::models::{IssueTimestamp, UserId};
use crate::stores::SessionStore;

pub const DEFAULT_TIMEOUT_MINUTES: i64 = 20;

/// Check `issued_at` against the local clock.
///
/// Elapsed time is counted in whole minutes, rounded down, and must stay
/// strictly below `timeout_minutes`. A timestamp ahead of `now` is rejected.
pub fn check_local_validity(
    issued_at: IssueTimestamp,
    now: i64,
    timeout_minutes: i64,
) -> Result<(), LocalValidityError> {
    let issued = issued_at.as_secs();
    if now < issued {
        return Err(LocalValidityError::ClockSkew {
            issued_at: issued,
            now,
        });
    }

    let elapsed_minutes = (now - issued) / 60;
    if elapsed_minutes < timeout_minutes {
        Ok(())
    } else {
        Err(LocalValidityError::Expired {
            elapsed_minutes,
            timeout_minutes,
        })
    }
}

/// Boolean form of [`check_local_validity`] over the raw page parameter
pub fn is_locally_valid(raw_timestamp: Option<&str>, now: i64, timeout_minutes: i64) -> bool {
    IssueTimestamp::parse(raw_timestamp)
        .and_then(|issued| check_local_validity(issued, now, timeout_minutes))
        .is_ok()
}

/// Which session store operation a remote confirmation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMode {
    /// Register or refresh the session (upsert)
    Register,
    /// Only ask whether it has expired
    Check,
}

/// Outcome of asking the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteConfirmation {
    pub is_expired: bool,
    pub confirmed_expiry: Option<i64>,
    /// False when the store could not be asked or its answer not read
    pub reachable: bool,
}

impl RemoteConfirmation {
    fn unreachable() -> Self {
        Self {
            is_expired: true,
            confirmed_expiry: None,
            reachable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationState {
    Unchecked,
    LocallyValid,
    LocallyInvalid,
    RemoteConfirmedValid,
    RemoteConfirmedExpired,
    RemoteUnreachable,
}

impl ValidationState {
    /// Only a session the store confirmed as live lets the form proceed
    pub fn is_usable(self) -> bool {
        matches!(self, ValidationState::RemoteConfirmedValid)
    }
}

pub struct SessionValidator {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    timeout_minutes: i64,
    cached_expiry: Option<i64>,
    state: ValidationState,
}

impl SessionValidator {
    /// Validator for a fresh page load; the expiry cache starts empty
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, timeout_minutes: i64) -> Self {
        Self {
            store,
            clock,
            timeout_minutes,
            cached_expiry: None,
            state: ValidationState::Unchecked,
        }
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub fn timeout_minutes(&self) -> i64 {
        self.timeout_minutes
    }

    pub fn check_local(&self, issued_at: IssueTimestamp) -> Result<(), LocalValidityError> {
        check_local_validity(issued_at, self.clock.now(), self.timeout_minutes)
    }

    pub fn is_locally_valid(&self, raw_timestamp: Option<&str>) -> bool {
        is_locally_valid(raw_timestamp, self.clock.now(), self.timeout_minutes)
    }

    /// Ask the session store about `(user_id, issued_at)`.
    ///
    /// Never fails: a store that cannot be reached or answers with something
    /// unreadable yields an expired, unreachable confirmation.
    pub async fn confirm_remotely(
        &mut self,
        user_id: &UserId,
        issued_at: IssueTimestamp,
        mode: RemoteMode,
    ) -> RemoteConfirmation {
        let issued = issued_at.as_secs();
        let result = match mode {
            RemoteMode::Register => self.store.upsert_session(user_id, issued).await,
            RemoteMode::Check => self.store.check_session(user_id, issued).await,
        };

        match result {
            Ok(verdict) => {
                match verdict.timestamp {
                    Some(expiry) => self.cache_expiry(expiry),
                    None if !verdict.is_expired => {
                        tracing::debug!(user_id = %user_id, ?mode, "Session store sent no expiry, cache unchanged")
                    }
                    None => {}
                }
                tracing::debug!(
                    user_id = %user_id,
                    ?mode,
                    is_expired = verdict.is_expired,
                    confirmed_expiry = ?verdict.timestamp,
                    "Session store answered"
                );
                RemoteConfirmation {
                    is_expired: verdict.is_expired,
                    confirmed_expiry: verdict.timestamp,
                    reachable: true,
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, ?mode, "Session store call failed, treating session as expired: {}", e);
                RemoteConfirmation::unreachable()
            }
        }
    }

    /// Remember the store-confirmed expiry, replacing any earlier value
    pub fn cache_expiry(&mut self, expiry: i64) {
        self.cached_expiry = Some(expiry);
    }

    pub fn clear_cache(&mut self) {
        self.cached_expiry = None;
    }

    pub fn cached_expiry(&self) -> Option<i64> {
        self.cached_expiry
    }

    pub fn is_cached_still_valid(&self) -> bool {
        match self.cached_expiry {
            Some(expiry) => self.clock.now() < expiry,
            None => false,
        }
    }

    /// Run the page-load decision sequence and return the final state.
    ///
    /// Locally valid sessions are registered with the store and stay usable
    /// unless the store says otherwise. Locally invalid ones are only checked,
    /// and the store's verdict is final. A timestamp that cannot be parsed
    /// never reaches the store.
    pub async fn initialize(&mut self, user_id: &UserId, raw_timestamp: Option<&str>) -> ValidationState {
        let issued_at = match IssueTimestamp::parse(raw_timestamp) {
            Ok(issued_at) => issued_at,
            Err(e) => {
                tracing::info!(user_id = %user_id, "Rejecting page load: {}", e);
                self.state = ValidationState::LocallyInvalid;
                return self.state;
            }
        };

        let mode = match self.check_local(issued_at) {
            Ok(()) => {
                self.state = ValidationState::LocallyValid;
                RemoteMode::Register
            }
            Err(e) => {
                tracing::debug!(user_id = %user_id, "Local check failed, asking session store: {}", e);
                self.state = ValidationState::LocallyInvalid;
                RemoteMode::Check
            }
        };

        let confirmation = self.confirm_remotely(user_id, issued_at, mode).await;
        self.state = if !confirmation.reachable {
            ValidationState::RemoteUnreachable
        } else if confirmation.is_expired {
            ValidationState::RemoteConfirmedExpired
        } else {
            ValidationState::RemoteConfirmedValid
        };

        tracing::info!(user_id = %user_id, state = ?self.state, "Session validated");
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::RemoteError;
    use crate::models::SessionVerdict;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000;

    /// Session store double that replays a fixed answer and records calls
    struct ScriptedStore {
        answer: Option<SessionVerdict>,
        calls: Mutex<Vec<(RemoteMode, String, i64)>>,
    }

    impl ScriptedStore {
        fn answering(is_expired: bool, timestamp: Option<i64>) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(SessionVerdict { is_expired, timestamp }),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn reply(&self, mode: RemoteMode, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .push((mode, user_id.to_string(), issued_at));
            self.answer
                .clone()
                .ok_or_else(|| RemoteError::Decode("connection reset".into()))
        }

        fn calls(&self) -> Vec<(RemoteMode, String, i64)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionStore for ScriptedStore {
        async fn upsert_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
            self.reply(RemoteMode::Register, user_id, issued_at)
        }

        async fn check_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
            self.reply(RemoteMode::Check, user_id, issued_at)
        }
    }

    fn validator(store: Arc<ScriptedStore>, clock: Arc<ManualClock>) -> SessionValidator {
        SessionValidator::new(store, clock, DEFAULT_TIMEOUT_MINUTES)
    }

    fn uid() -> UserId {
        UserId::parse("1234567890").unwrap()
    }

    #[test]
    fn test_window_boundary_is_strict() {
        let t = |secs| IssueTimestamp::new(secs);
        assert!(check_local_validity(t(NOW - 19 * 60), NOW, 20).is_ok());
        assert!(check_local_validity(t(NOW - (20 * 60 - 1)), NOW, 20).is_ok());
        assert_eq!(
            check_local_validity(t(NOW - 20 * 60), NOW, 20),
            Err(LocalValidityError::Expired {
                elapsed_minutes: 20,
                timeout_minutes: 20
            })
        );
        assert!(check_local_validity(t(NOW), NOW, 20).is_ok());
    }

    #[test]
    fn test_future_timestamp_is_clock_skew() {
        assert_eq!(
            check_local_validity(IssueTimestamp::new(NOW + 60), NOW, 20),
            Err(LocalValidityError::ClockSkew {
                issued_at: NOW + 60,
                now: NOW
            })
        );
        assert!(!is_locally_valid(Some(&(NOW + 1).to_string()), NOW, 20));
    }

    #[test]
    fn test_unusable_raw_timestamps_fail_closed() {
        assert!(!is_locally_valid(None, NOW, 20));
        assert!(!is_locally_valid(Some(""), NOW, 20));
        assert!(!is_locally_valid(Some("soon"), NOW, 20));
        assert!(is_locally_valid(Some(&(NOW - 60).to_string()), NOW, 20));
    }

    #[test]
    fn test_cache_then_check() {
        let clock = Arc::new(ManualClock::new(NOW));
        let mut v = validator(ScriptedStore::failing(), clock);

        assert!(!v.is_cached_still_valid());
        v.cache_expiry(NOW + 300);
        assert!(v.is_cached_still_valid());
        v.cache_expiry(NOW - 1);
        assert!(!v.is_cached_still_valid());
        v.cache_expiry(NOW);
        assert!(!v.is_cached_still_valid());
        v.clear_cache();
        assert_eq!(v.cached_expiry(), None);
    }

    #[tokio::test]
    async fn test_unreachable_store_reads_as_expired() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = ScriptedStore::failing();
        let mut v = validator(store.clone(), clock);

        let confirmation = v
            .confirm_remotely(&uid(), IssueTimestamp::new(NOW - 60), RemoteMode::Register)
            .await;
        assert!(confirmation.is_expired);
        assert!(!confirmation.reachable);
        assert_eq!(v.cached_expiry(), None);

        assert_eq!(
            v.initialize(&uid(), Some(&(NOW - 60).to_string())).await,
            ValidationState::RemoteUnreachable
        );
        assert!(!v.state().is_usable());
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_locally_valid_registers_and_caches() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = ScriptedStore::answering(false, Some(NOW + 900));
        let mut v = validator(store.clone(), clock);

        let state = v.initialize(&uid(), Some(&(NOW - 300).to_string())).await;
        assert_eq!(state, ValidationState::RemoteConfirmedValid);
        assert!(state.is_usable());
        assert_eq!(v.cached_expiry(), Some(NOW + 900));
        assert_eq!(
            store.calls(),
            vec![(RemoteMode::Register, "1234567890".to_string(), NOW - 300)]
        );
    }

    #[tokio::test]
    async fn test_locally_valid_but_store_says_expired() {
        let clock = Arc::new(ManualClock::new(NOW));
        let mut v = validator(ScriptedStore::answering(true, None), clock);

        let state = v.initialize(&uid(), Some(&(NOW - 300).to_string())).await;
        assert_eq!(state, ValidationState::RemoteConfirmedExpired);
        assert!(!v.is_cached_still_valid());
    }

    #[tokio::test]
    async fn test_locally_invalid_only_checks() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = ScriptedStore::answering(false, Some(NOW + 120));
        let mut v = validator(store.clone(), clock);

        // older than the local window, but the store extended it
        let state = v.initialize(&uid(), Some(&(NOW - 45 * 60).to_string())).await;
        assert_eq!(state, ValidationState::RemoteConfirmedValid);
        assert_eq!(store.calls()[0].0, RemoteMode::Check);
        assert!(v.is_cached_still_valid());
    }

    #[tokio::test]
    async fn test_future_timestamp_is_checked_not_registered() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = ScriptedStore::answering(true, None);
        let mut v = validator(store.clone(), clock);

        let state = v.initialize(&uid(), Some(&(NOW + 60).to_string())).await;
        assert_eq!(state, ValidationState::RemoteConfirmedExpired);
        assert_eq!(store.calls()[0].0, RemoteMode::Check);
    }

    #[tokio::test]
    async fn test_missing_timestamp_never_reaches_store() {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = ScriptedStore::answering(false, Some(NOW + 900));
        let mut v = validator(store.clone(), clock);

        assert_eq!(v.initialize(&uid(), None).await, ValidationState::LocallyInvalid);
        assert_eq!(v.initialize(&uid(), Some("abc")).await, ValidationState::LocallyInvalid);
        assert!(store.calls().is_empty());
        assert!(!v.state().is_usable());
    }

    #[tokio::test]
    async fn test_later_confirmation_overwrites_cache() {
        let clock = Arc::new(ManualClock::new(NOW));
        let mut v = validator(ScriptedStore::answering(false, Some(NOW + 60)), clock);
        v.cache_expiry(NOW + 3600);

        v.confirm_remotely(&uid(), IssueTimestamp::new(NOW), RemoteMode::Check)
            .await;
        assert_eq!(v.cached_expiry(), Some(NOW + 60));
    }
}
