// web-server/src/api/page.rs
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use common::identity::{PageParams, PlatformReport};
use common::models::AddressForm;
use common::PageState;
use serde::Serialize;

use super::error::{ApiError, EXPIRED_MESSAGE};
use crate::page_registry::PageHandle;
use crate::state::AppState;

// Cookie carrying the page id
pub const PAGE_COOKIE_NAME: &str = "webview_page";

const SUBMITTED_MESSAGE: &str = "Address confirmed. Thank you!";

/// Page state as the webview renders it
#[derive(Debug, Serialize)]
pub struct PageView {
    #[serde(flatten)]
    pub state: PageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// Ask the page to close the webview
    pub close_view: bool,
}

impl From<PageState> for PageView {
    fn from(state: PageState) -> Self {
        let (message, close_view) = match &state {
            PageState::Expired => (Some(EXPIRED_MESSAGE), false),
            PageState::Submitted => (Some(SUBMITTED_MESSAGE), true),
            PageState::Loading | PageState::Form { .. } => (None, false),
        };
        Self {
            state,
            message,
            close_view,
        }
    }
}

fn page_id(req: &HttpRequest) -> Result<String, ApiError> {
    req.cookie(PAGE_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::UnknownPage)
}

fn page(req: &HttpRequest, state: &AppState) -> Result<PageHandle, ApiError> {
    let page_id = page_id(req)?;
    state.registry.get(&page_id).ok_or_else(|| {
        tracing::debug!("Unknown or expired page id");
        ApiError::UnknownPage
    })
}

// Start a page load
#[post("/page")]
pub async fn create_page(state: web::Data<AppState>) -> HttpResponse {
    let page_id = state.registry.create(state.new_page());

    // the webview may be framed by the platform, so SameSite=None
    let cookie = Cookie::build(PAGE_COOKIE_NAME, page_id)
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::None)
        .max_age(CookieDuration::seconds(state.registry.page_ttl()))
        .finish();

    tracing::info!("Created page load");
    HttpResponse::Ok()
        .cookie(cookie)
        .json(PageView::from(PageState::Loading))
}

// One-shot report of the platform SDK context. The psid is whatever the page
// claims; a configured app secret puts the signed request ahead of it.
#[post("/platform/context")]
pub async fn report_platform_context(
    req: HttpRequest,
    state: web::Data<AppState>,
    report: web::Json<PlatformReport>,
) -> Result<HttpResponse, ApiError> {
    let page_id = page_id(&req)?;
    let report = report.into_inner();
    tracing::debug!(available = report.available, "Platform context reported");
    state.registry.take_notifier(&page_id)?.notify(report);

    Ok(HttpResponse::NoContent().finish())
}

// Resolve the user and validate the session
#[post("/session/init")]
pub async fn init_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Json<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let handle = page(&req, &state)?;
    let resolver = state.resolver(handle.ready.clone());

    // held for the whole initialization, so a submission waits for the cache
    let mut session = handle.session.lock().await;
    let settled = session.initialize(&resolver, &params).await;

    Ok(HttpResponse::Ok().json(PageView::from(settled)))
}

#[get("/page/state")]
pub async fn get_page_state(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let handle = page(&req, &state)?;
    let session = handle.session.lock().await;
    Ok(HttpResponse::Ok().json(PageView::from(session.state().clone())))
}

#[post("/address")]
pub async fn submit_address(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Json<AddressForm>,
) -> Result<HttpResponse, ApiError> {
    let handle = page(&req, &state)?;
    let mut session = handle.session.lock().await;
    let submitted = session.submit(form.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PageView::from(submitted)))
}
