// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

use crate::identity::StrategyKind;
use crate::token::{TokenEncoding, TokenScheme};
use crate::validator::DEFAULT_TIMEOUT_MINUTES;

/// Central configuration for the webview backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub web_server_addr: String,
    pub token: TokenConfig,
    pub session: SessionConfig,
    pub stores: StoresConfig,
    pub platform: PlatformConfig,

    // Static file serving configuration
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Shared secret with the token issuer
    pub key: String,
    #[serde(default)]
    pub scheme: TokenScheme,
    #[serde(default)]
    pub encoding: TokenEncoding,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("key", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("encoding", &self.encoding)
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Local validity window measured from the issue timestamp
    pub timeout_minutes: i64,
    /// How long a page load stays in the registry
    pub page_ttl_secs: i64,
    pub cleanup_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Http,
    /// In-process stores for local development
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub session_store_url: String,
    pub address_store_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// App secret used to verify signed requests; the strategy is off without it
    #[serde(default)]
    pub app_secret: Option<String>,
    /// Upper bound on waiting for the page to report the SDK context
    pub ready_timeout_ms: u64,
    /// Identifier resolution strategies, tried in this order
    pub strategies: Vec<StrategyKind>,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("ready_timeout_ms", &self.ready_timeout_ms)
            .field("strategies", &self.strategies)
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            token: TokenConfig {
                key: "superkeyahafood1".to_string(),
                scheme: TokenScheme::default(),
                encoding: TokenEncoding::default(),
            },
            session: SessionConfig {
                timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
                page_ttl_secs: 3600,
                cleanup_interval_secs: 300,
            },
            stores: StoresConfig {
                backend: StoreBackend::Http,
                session_store_url: "https://redis-session-manage.onrender.com".to_string(),
                address_store_url: "https://mongodb-manage.onrender.com".to_string(),
                request_timeout_secs: 10,
            },
            platform: PlatformConfig {
                app_secret: None,
                ready_timeout_ms: 5000,
                strategies: vec![
                    StrategyKind::PlatformContext,
                    StrategyKind::SignedRequest,
                    StrategyKind::EncryptedToken,
                ],
            },
            static_files: StaticFilesConfig {
                path: "./static".to_string(),
                index: "index.html".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let defaults = ConfigFile::try_from(&Config::default())?;

        let config = ConfigFile::builder()
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Add a local config file for local overrides
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__TOKEN__KEY
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_plain_env(|name| env::var(name).ok())
            }
        }
    }

    fn from_plain_env(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("WEB_SERVER_ADDR") {
            config.web_server_addr = addr;
        }
        if let Some(key) = var("TOKEN_KEY") {
            config.token.key = key;
        }
        if let Some(url) = var("SESSION_STORE_URL") {
            config.stores.session_store_url = url;
        }
        if let Some(url) = var("ADDRESS_STORE_URL") {
            config.stores.address_store_url = url;
        }
        if let Some(timeout) = var("SESSION_TIMEOUT_MINUTES").and_then(|v| v.parse().ok()) {
            config.session.timeout_minutes = timeout;
        }
        config.platform.app_secret = var("PLATFORM_APP_SECRET").or(config.platform.app_secret);
        if let Some(path) = var("STATIC_FILES_PATH") {
            config.static_files.path = path;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_issuer() {
        let config = Config::default();
        assert_eq!(config.token.key.len(), crate::token::AES_KEY_LEN);
        assert_eq!(config.session.timeout_minutes, 20);
        assert_eq!(config.platform.strategies.len(), 3);
    }

    #[test]
    fn test_plain_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TOKEN_KEY", "0123456789abcdef"),
            ("SESSION_TIMEOUT_MINUTES", "15"),
            ("PLATFORM_APP_SECRET", "shh"),
            ("SESSION_STORE_URL", "http://localhost:9000"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_plain_env(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.token.key, "0123456789abcdef");
        assert_eq!(config.session.timeout_minutes, 15);
        assert_eq!(config.platform.app_secret.as_deref(), Some("shh"));
        assert_eq!(config.stores.session_store_url, "http://localhost:9000");
        assert_eq!(config.stores.address_store_url, Config::default().stores.address_store_url);
    }

    #[test]
    fn test_secrets_are_not_printed() {
        let mut config = Config::default();
        config.platform.app_secret = Some("shh".into());
        let printed = format!("{config:?}");
        assert!(!printed.contains("superkeyahafood1"));
        assert!(!printed.contains("shh"));
    }

    #[test]
    fn test_enums_deserialize_from_snake_case() {
        let token: TokenConfig = serde_json::from_str(
            r#"{"key":"k","scheme":"xor","encoding":"base64"}"#,
        )
        .unwrap();
        assert_eq!(token.scheme, TokenScheme::Xor);
        assert_eq!(token.encoding, TokenEncoding::Base64);

        let stores: StoresConfig = serde_json::from_str(
            r#"{"backend":"memory","session_store_url":"a","address_store_url":"b","request_timeout_secs":1}"#,
        )
        .unwrap();
        assert_eq!(stores.backend, StoreBackend::Memory);
    }
}
