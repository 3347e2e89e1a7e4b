// common/src/stores/session_store.rs
use async_trait::async_trait;
use std::time::Duration;

use super::{http_client, read_json};
use crate::error::RemoteError;
use crate::models::{SessionRequest, SessionVerdict, UserId};

/// Remote service tracking issue and expiry times per user
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register the session, or refresh it if already known
    async fn upsert_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError>;

    /// Look the session up without registering it
    async fn check_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError>;
}

/// Session store spoken to over its REST API
#[derive(Clone, Debug)]
pub struct HttpSessionStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: super::base_url(base_url),
        })
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn upsert_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
        let body = SessionRequest {
            psid: user_id.to_string(),
            timestamp: issued_at,
        };
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn check_session(&self, user_id: &UserId, issued_at: i64) -> Result<SessionVerdict, RemoteError> {
        let response = self
            .client
            .get(format!("{}/session/{}/{}", self.base_url, user_id, issued_at))
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_dropped() {
        let store = HttpSessionStore::new("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url, "http://localhost:9000");
        assert_eq!(super::super::base_url("http://a//"), "http://a");
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        // nothing listens on port 9 of the loopback interface
        let store = HttpSessionStore::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let user_id = UserId::parse("1234").unwrap();
        let err = store.check_session(&user_id, 1_700_000_000).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
