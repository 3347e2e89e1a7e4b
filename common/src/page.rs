// common/src/page.rs
//! One webview page load: resolve the user, validate the session, collect
//! the address.
use serde::Serialize;
use std::sync::Arc;

use crate::error::SubmitError;
use crate::identity::{IdentityResolver, PageParams};
use crate::models::{AddressForm, AddressSubmission, IssueTimestamp, UserId};
use crate::stores::AddressStore;
use crate::validator::{SessionValidator, ValidationState};

/// What the page should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState {
    Loading,
    Form { prefill: Option<AddressForm> },
    /// Session expired, or anything else that went wrong before the form
    Expired,
    /// Address saved; the page should close the webview
    Submitted,
}

pub struct PageSession {
    validator: SessionValidator,
    addresses: Arc<dyn AddressStore>,
    session: Option<(UserId, IssueTimestamp)>,
    state: PageState,
}

impl PageSession {
    pub fn new(validator: SessionValidator, addresses: Arc<dyn AddressStore>) -> Self {
        Self {
            validator,
            addresses,
            session: None,
            state: PageState::Loading,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn validation_state(&self) -> ValidationState {
        self.validator.state()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(|(user_id, _)| user_id)
    }

    /// Run the page-load sequence once; later calls return the settled state
    pub async fn initialize(&mut self, resolver: &IdentityResolver, params: &PageParams) -> PageState {
        if self.state != PageState::Loading {
            tracing::debug!("Page already initialized");
            return self.state.clone();
        }

        let resolved = match resolver.resolve(params).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::info!("Could not identify user: {}", e);
                self.state = PageState::Expired;
                return self.state.clone();
            }
        };
        let user_id = resolved.user_id;

        let validation = self
            .validator
            .initialize(&user_id, params.timestamp.as_deref())
            .await;
        let issued_at = IssueTimestamp::parse(params.timestamp.as_deref()).ok();

        // a form nothing could be submitted from is shown as expired
        let submittable = validation.is_usable() && self.validator.is_cached_still_valid();
        if validation.is_usable() && !submittable {
            tracing::warn!(
                user_id = %user_id,
                cached_expiry = ?self.validator.cached_expiry(),
                "Session store confirmed the session without a usable expiry"
            );
        }

        self.state = match (submittable, issued_at) {
            (true, Some(issued_at)) => {
                let prefill = self.prefill(&user_id, issued_at).await;
                self.session = Some((user_id, issued_at));
                PageState::Form { prefill }
            }
            _ => PageState::Expired,
        };
        self.state.clone()
    }

    async fn prefill(&self, user_id: &UserId, issued_at: IssueTimestamp) -> Option<AddressForm> {
        match self.addresses.fetch_address(user_id, issued_at.as_secs()).await {
            Ok(record) => record.map(|record| record.form),
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Could not load saved address, showing empty form: {}", e);
                None
            }
        }
    }

    /// Submit the address form.
    ///
    /// Judged only by the expiry the session store last confirmed; the
    /// local time window plays no part here.
    pub async fn submit(&mut self, form: AddressForm) -> Result<PageState, SubmitError> {
        let (user_id, issued_at) = match (&self.state, &self.session) {
            (PageState::Form { .. }, Some(session)) => session.clone(),
            _ => return Err(SubmitError::NotReady),
        };

        if !self.validator.is_cached_still_valid() {
            tracing::info!(user_id = %user_id, "Submission after confirmed expiry");
            self.state = PageState::Expired;
            return Err(SubmitError::SessionExpired);
        }

        let form = form.validate()?;
        let submission = AddressSubmission {
            psid: user_id.to_string(),
            timestamp: issued_at.as_secs(),
            form,
        };
        self.addresses.submit_address(&submission).await?;

        tracing::info!(user_id = %user_id, "Address submitted");
        self.state = PageState::Submitted;
        Ok(self.state.clone())
    }
}
