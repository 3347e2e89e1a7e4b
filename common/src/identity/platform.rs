// common/src/identity/platform.rs
//! Platform SDK context, reported once per page load.
//!
//! The page asks the chat platform SDK for the user's context and reports
//! the result. Initialization awaits that one-shot signal for a bounded
//! time instead of polling for the SDK.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

use super::{IdentityStrategy, PageParams};
use crate::error::IdentityError;
use crate::models::UserId;

/// What the page learned from the platform SDK
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlatformReport {
    pub available: bool,
    #[serde(default)]
    pub psid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug)]
enum ReadyOutcome {
    Ready(UserId),
    Unavailable(String),
    Rejected(String),
}

impl From<PlatformReport> for ReadyOutcome {
    fn from(report: PlatformReport) -> Self {
        if !report.available {
            return ReadyOutcome::Unavailable(
                report.error.unwrap_or_else(|| "reported unavailable".to_string()),
            );
        }
        match report.psid.as_deref().map(UserId::parse) {
            Some(Ok(user_id)) => ReadyOutcome::Ready(user_id),
            Some(Err(_)) => ReadyOutcome::Rejected("context carried an implausible identifier".into()),
            None => ReadyOutcome::Rejected("context carried no identifier".into()),
        }
    }
}

/// Create the one-shot signal for a page load
pub fn ready_channel() -> (PlatformNotifier, PlatformReady) {
    let (tx, rx) = watch::channel(None);
    (PlatformNotifier { tx }, PlatformReady { rx })
}

/// Sending half; consumed by the single report
#[derive(Debug)]
pub struct PlatformNotifier {
    tx: watch::Sender<Option<ReadyOutcome>>,
}

impl PlatformNotifier {
    pub fn notify(self, report: PlatformReport) {
        // nobody waiting is fine, the value is dropped with the page
        let _ = self.tx.send(Some(report.into()));
    }
}

/// Receiving half; cheap to clone, every clone sees the same report
#[derive(Clone, Debug)]
pub struct PlatformReady {
    rx: watch::Receiver<Option<ReadyOutcome>>,
}

impl PlatformReady {
    /// Wait at most `timeout` for the report
    pub async fn wait(&self, timeout: Duration) -> Result<UserId, IdentityError> {
        let mut rx = self.rx.clone();
        let waited = tokio::time::timeout(timeout, async move {
            loop {
                let current = rx.borrow_and_update().clone();
                if current.is_some() {
                    return current;
                }
                if rx.changed().await.is_err() {
                    // notifier dropped without reporting
                    return rx.borrow().clone();
                }
            }
        })
        .await;

        match waited {
            Err(_) => Err(IdentityError::Unavailable(format!(
                "no platform context within {}ms",
                timeout.as_millis()
            ))),
            Ok(None) => Err(IdentityError::Unavailable("page went away before reporting".into())),
            Ok(Some(ReadyOutcome::Ready(user_id))) => Ok(user_id),
            Ok(Some(ReadyOutcome::Unavailable(reason))) => Err(IdentityError::Unavailable(reason)),
            Ok(Some(ReadyOutcome::Rejected(reason))) => Err(IdentityError::Rejected(reason)),
        }
    }
}

/// Identifier straight from the platform SDK context
pub struct PlatformContextStrategy {
    ready: PlatformReady,
    timeout: Duration,
}

impl PlatformContextStrategy {
    pub fn new(ready: PlatformReady, timeout: Duration) -> Self {
        Self { ready, timeout }
    }
}

#[async_trait]
impl IdentityStrategy for PlatformContextStrategy {
    fn name(&self) -> &'static str {
        "platform_context"
    }

    async fn resolve(&self, _params: &PageParams) -> Result<UserId, IdentityError> {
        self.ready.wait(self.timeout).await
    }
}
