// web-server/src/api/mod.rs
pub mod error;
pub mod page;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(page::create_page)
            .service(page::report_platform_context)
            .service(page::init_session)
            .service(page::get_page_state)
            .service(page::submit_address)
    );
}
