// common/src/identity/encrypted_token.rs
use async_trait::async_trait;
use std::sync::Arc;

use super::{param, IdentityStrategy, PageParams};
use crate::error::IdentityError;
use crate::models::UserId;
use crate::token::TokenCodec;
use crate::utils::redact;

/// Identifier carried in the encrypted `token` URL parameter
pub struct EncryptedTokenStrategy {
    codec: Arc<TokenCodec>,
}

impl EncryptedTokenStrategy {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

#[async_trait]
impl IdentityStrategy for EncryptedTokenStrategy {
    fn name(&self) -> &'static str {
        "encrypted_token"
    }

    async fn resolve(&self, params: &PageParams) -> Result<UserId, IdentityError> {
        let token = param(&params.token).ok_or(IdentityError::NotProvided)?;
        self.codec.decrypt(token).map_err(|e| {
            tracing::debug!(token = %redact(token), "Token rejected: {}", e);
            IdentityError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenError;
    use crate::token::{TokenEncoding, TokenScheme};

    fn strategy() -> EncryptedTokenStrategy {
        let codec = TokenCodec::new(b"superkeyahafood1", TokenScheme::Aes128Ecb, TokenEncoding::Base64url).unwrap();
        EncryptedTokenStrategy::new(Arc::new(codec))
    }

    fn with_token(token: &str) -> PageParams {
        PageParams {
            token: Some(token.into()),
            ..PageParams::default()
        }
    }

    #[tokio::test]
    async fn test_resolves_issuer_token() {
        let user_id = strategy().resolve(&with_token("hS87HBkUNbPwa5D100NFeg")).await.unwrap();
        assert_eq!(user_id.as_str(), "1234567890");
    }

    #[tokio::test]
    async fn test_missing_and_broken_tokens() {
        assert!(matches!(
            strategy().resolve(&PageParams::default()).await,
            Err(IdentityError::NotProvided)
        ));
        assert!(matches!(
            strategy().resolve(&with_token("")).await,
            Err(IdentityError::NotProvided)
        ));
        assert!(matches!(
            strategy().resolve(&with_token("%%%")).await,
            Err(IdentityError::Token(TokenError::Decode(_)))
        ));
    }
}
