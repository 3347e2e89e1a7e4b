// common/src/utils.rs
use tracing_subscriber::EnvFilter;

/// Setup tracing for the server, filtered by `RUST_LOG` (default `info`)
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already installed");
    }
}

/// Shorten a token for log lines; the full value never goes to the logs
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}… ({} chars)", prefix, token.chars().count())
}
