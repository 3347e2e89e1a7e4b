// common/src/identity/mod.rs
//! Identifier resolution: one step over an ordered list of strategies.
//!
//! Each strategy either produces the user's identifier or says why it could
//! not. The first success wins.
pub mod encrypted_token;
pub mod platform;
pub mod signed_request;

pub use encrypted_token::EncryptedTokenStrategy;
pub use platform::{ready_channel, PlatformContextStrategy, PlatformNotifier, PlatformReady, PlatformReport};
pub use signed_request::SignedRequestStrategy;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PlatformConfig;
use crate::error::IdentityError;
use crate::models::UserId;
use crate::token::TokenCodec;

/// Identifier sources, in the names used by the configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PlatformContext,
    SignedRequest,
    EncryptedToken,
}

/// Incoming page parameters, forwarded by the page from its URL
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub signed_request: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    }))
}

/// Non-empty, trimmed value of an optional parameter
pub(crate) fn param(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Configured strategy order, with a verifiable `signed_request` moved
/// ahead of `platform_context`
fn effective_order(config: &PlatformConfig) -> Vec<StrategyKind> {
    let mut order = config.strategies.clone();
    if config.app_secret.is_none() {
        return order;
    }

    let platform = order.iter().position(|k| *k == StrategyKind::PlatformContext);
    let signed = order.iter().position(|k| *k == StrategyKind::SignedRequest);
    if let (Some(platform), Some(signed)) = (platform, signed) {
        if signed > platform {
            let kind = order.remove(signed);
            order.insert(platform, kind);
        }
    }
    order
}

#[async_trait]
pub trait IdentityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, params: &PageParams) -> Result<UserId, IdentityError>;
}

/// Identifier together with the strategy that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: UserId,
    pub strategy: &'static str,
}

#[derive(Default)]
pub struct IdentityResolver {
    strategies: Vec<Box<dyn IdentityStrategy>>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: impl IdentityStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Box<dyn IdentityStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolver for one page load, strategies in configured order.
    ///
    /// `signed_request` is left out when no app secret is configured. With a
    /// secret it runs ahead of `platform_context`, whose identifier is only
    /// what the page reports and carries no signature.
    pub fn from_config(config: &PlatformConfig, codec: Arc<TokenCodec>, ready: PlatformReady) -> Self {
        let mut resolver = Self::new();
        for kind in &effective_order(config) {
            match kind {
                StrategyKind::PlatformContext => resolver.push(Box::new(PlatformContextStrategy::new(
                    ready.clone(),
                    Duration::from_millis(config.ready_timeout_ms),
                ))),
                StrategyKind::SignedRequest => match &config.app_secret {
                    Some(secret) => resolver.push(Box::new(SignedRequestStrategy::new(secret.as_bytes()))),
                    None => tracing::debug!("Skipping signed_request strategy, no app secret configured"),
                },
                StrategyKind::EncryptedToken => {
                    resolver.push(Box::new(EncryptedTokenStrategy::new(codec.clone())))
                }
            }
        }
        resolver
    }

    /// Try every strategy in order until one yields an identifier
    pub async fn resolve(&self, params: &PageParams) -> Result<ResolvedIdentity, IdentityError> {
        for strategy in &self.strategies {
            match strategy.resolve(params).await {
                Ok(user_id) => {
                    tracing::debug!(strategy = strategy.name(), user_id = %user_id, "Identifier resolved");
                    return Ok(ResolvedIdentity {
                        user_id,
                        strategy: strategy.name(),
                    });
                }
                Err(IdentityError::NotProvided) => {
                    tracing::trace!(strategy = strategy.name(), "No input for strategy");
                }
                Err(e) => {
                    tracing::info!(strategy = strategy.name(), "Identifier strategy failed: {}", e);
                }
            }
        }
        Err(IdentityError::Exhausted)
    }
}
