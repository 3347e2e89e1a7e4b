// common/src/identity/signed_request.rs
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{param, IdentityStrategy, PageParams};
use crate::error::IdentityError;
use crate::models::UserId;

type HmacSha256 = Hmac<Sha256>;

const SIGNED_REQUEST_ALGORITHM: &str = "HMAC-SHA256";

#[derive(Debug, Deserialize)]
struct SignedPayload {
    algorithm: String,
    #[serde(default)]
    psid: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, IdentityError> {
    base64::decode_config(segment.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
        .map_err(|e| IdentityError::Rejected(format!("bad signed request encoding: {e}")))
}

/// Verify a platform `signed_request` and extract the user identifier.
///
/// Format is `base64url(signature).base64url(payload)`, where the signature
/// is HMAC-SHA256 over the encoded payload keyed with the app secret.
pub fn verify_signed_request(raw: &str, app_secret: &[u8]) -> Result<UserId, IdentityError> {
    let (signature, payload) = raw
        .split_once('.')
        .ok_or_else(|| IdentityError::Rejected("signed request has no payload".into()))?;

    let signature = decode_segment(signature)?;
    let mut mac = HmacSha256::new_from_slice(app_secret)
        .map_err(|e| IdentityError::Rejected(format!("unusable app secret: {e}")))?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| IdentityError::Rejected("signed request signature mismatch".into()))?;

    let payload: SignedPayload = serde_json::from_slice(&decode_segment(payload)?)
        .map_err(|e| IdentityError::Rejected(format!("bad signed request payload: {e}")))?;
    if !payload.algorithm.eq_ignore_ascii_case(SIGNED_REQUEST_ALGORITHM) {
        return Err(IdentityError::Rejected(format!(
            "unexpected signed request algorithm {}",
            payload.algorithm
        )));
    }

    let raw_id = payload
        .psid
        .or(payload.user_id)
        .ok_or_else(|| IdentityError::Rejected("signed request carries no identifier".into()))?;
    UserId::parse(&raw_id)
        .map_err(|_| IdentityError::Rejected("signed request identifier is implausible".into()))
}

/// Identifier from the platform's signed request parameter
pub struct SignedRequestStrategy {
    app_secret: Vec<u8>,
}

impl SignedRequestStrategy {
    pub fn new(app_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            app_secret: app_secret.into(),
        }
    }
}

#[async_trait]
impl IdentityStrategy for SignedRequestStrategy {
    fn name(&self) -> &'static str {
        "signed_request"
    }

    async fn resolve(&self, params: &PageParams) -> Result<UserId, IdentityError> {
        let raw = param(&params.signed_request).ok_or(IdentityError::NotProvided)?;
        verify_signed_request(raw, &self.app_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"app-secret";
    // payload {"algorithm":"HMAC-SHA256","psid":"1234567890","issued_at":1700000000}
    const SIGNED: &str = "otDD3_lbM_xwnpb_X3AwnRLnYjPfIrnQ8vYRS_HjwCk.eyJhbGdvcml0aG0iOiJITUFDLVNIQTI1NiIsInBzaWQiOiIxMjM0NTY3ODkwIiwiaXNzdWVkX2F0IjoxNzAwMDAwMDAwfQ";

    fn sign(payload_json: &str, secret: &[u8]) -> String {
        let payload = base64::encode_config(payload_json, base64::URL_SAFE_NO_PAD);
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(payload.as_bytes());
        let sig = base64::encode_config(mac.finalize().into_bytes(), base64::URL_SAFE_NO_PAD);
        format!("{sig}.{payload}")
    }

    #[test]
    fn test_known_signed_request() {
        assert_eq!(verify_signed_request(SIGNED, SECRET).unwrap().as_str(), "1234567890");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        assert!(matches!(
            verify_signed_request(SIGNED, b"other-secret"),
            Err(IdentityError::Rejected(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (sig, _) = SIGNED.split_once('.').unwrap();
        let forged = base64::encode_config(
            r#"{"algorithm":"HMAC-SHA256","psid":"999"}"#,
            base64::URL_SAFE_NO_PAD,
        );
        assert!(verify_signed_request(&format!("{sig}.{forged}"), SECRET).is_err());
        assert!(verify_signed_request("no-dot-here", SECRET).is_err());
    }

    #[test]
    fn test_user_id_fallback_and_algorithm_check() {
        let signed = sign(r#"{"algorithm":"HMAC-SHA256","user_id":"42"}"#, SECRET);
        assert_eq!(verify_signed_request(&signed, SECRET).unwrap().as_str(), "42");

        let signed = sign(r#"{"algorithm":"none","psid":"42"}"#, SECRET);
        assert!(verify_signed_request(&signed, SECRET).is_err());

        let signed = sign(r#"{"algorithm":"HMAC-SHA256"}"#, SECRET);
        assert!(verify_signed_request(&signed, SECRET).is_err());
    }

    #[tokio::test]
    async fn test_strategy_without_param_is_not_provided() {
        let strategy = SignedRequestStrategy::new(SECRET);
        assert!(matches!(
            strategy.resolve(&PageParams::default()).await,
            Err(IdentityError::NotProvided)
        ));

        let params = PageParams {
            signed_request: Some(SIGNED.into()),
            ..PageParams::default()
        };
        assert_eq!(strategy.resolve(&params).await.unwrap().as_str(), "1234567890");
    }
}
