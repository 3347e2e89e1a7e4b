// web-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::{web, Error, HttpRequest, HttpResponse, Result};
use common::StaticFilesConfig;
use std::path::PathBuf;

// SPA fallback: any unmatched route gets the webview's index page
async fn spa_index(req: HttpRequest, config: web::Data<StaticFilesConfig>) -> Result<HttpResponse, Error> {
    if req.path().starts_with("/api/") {
        return Ok(HttpResponse::NotFound().finish());
    }

    let index_path = PathBuf::from(&config.path).join(&config.index);
    let file = NamedFile::open(index_path)?;
    Ok(file.into_response(&req))
}

/// Serve the webview bundle with SPA fallback
pub fn configure(cfg: &mut web::ServiceConfig, config: StaticFilesConfig) {
    let config_data = web::Data::new(config.clone());

    cfg.app_data(config_data).service(
        Files::new("/", &config.path)
            .index_file(&config.index)
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true)
            .default_handler(web::route().to(spa_index)),
    );
}
