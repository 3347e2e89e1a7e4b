//! Clients for the remote session store and address store.
pub mod address_store;
pub mod memory;
pub mod session_store;

pub use address_store::{AddressStore, HttpAddressStore};
pub use memory::{MemoryAddressStore, MemorySessionStore};
pub use session_store::{HttpSessionStore, SessionStore};

use std::time::Duration;

use crate::error::RemoteError;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, RemoteError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

pub(crate) fn base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

/// Read a JSON body, mapping a bad status or shape to [`RemoteError`]
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}
