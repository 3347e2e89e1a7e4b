// common/src/stores/address_store.rs
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{http_client, read_json};
use crate::error::RemoteError;
use crate::models::{AddressRecord, AddressSubmission, UserId};

/// Remote service persisting the collected address form
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Address previously saved for this session, if any
    async fn fetch_address(&self, user_id: &UserId, issued_at: i64) -> Result<Option<AddressRecord>, RemoteError>;

    async fn submit_address(&self, submission: &AddressSubmission) -> Result<(), RemoteError>;
}

#[derive(Clone, Debug)]
pub struct HttpAddressStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAddressStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: super::base_url(base_url),
        })
    }
}

#[async_trait]
impl AddressStore for HttpAddressStore {
    async fn fetch_address(&self, user_id: &UserId, issued_at: i64) -> Result<Option<AddressRecord>, RemoteError> {
        let response = self
            .client
            .get(format!("{}/api/address/{}/{}", self.base_url, user_id, issued_at))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await
    }

    async fn submit_address(&self, submission: &AddressSubmission) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(format!("{}/api/address", self.base_url))
            .json(submission)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}
