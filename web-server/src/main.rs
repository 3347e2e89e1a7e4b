// Web Server - main.rs
// webview/web-server/src/main.rs
mod api;
mod page_registry;
mod state;
mod static_files;
mod utils;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use common::{setup_tracing, Config, SystemClock};
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();
    let server_addr = config.web_server_addr.clone();
    let static_config = config.static_files.clone();
    let cleanup_interval = Duration::from_secs(config.session.cleanup_interval_secs.max(1));

    let state = AppState::new(config, Arc::new(SystemClock))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let state = web::Data::new(state);

    tracing::info!(
        strategies = ?state.config.platform.strategies,
        backend = ?state.config.stores.backend,
        "Starting Web Server on {}",
        server_addr
    );

    // Periodic cleanup of abandoned page loads
    let cleanup_state = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = cleanup_state.registry.cleanup_expired();
            if removed > 0 {
                tracing::info!("Cleaned up {} expired page loads", removed);
            }
        }
    });

    HttpServer::new(move || {
        let static_config = static_config.clone();
        App::new()
            .app_data(state.clone())
            .service(health)
            .configure(api::configure)
            .configure(move |cfg| static_files::configure(cfg, static_config))
    })
    .bind(&server_addr)?
    .run()
    .await
}
