//! The factory-facing "poll for work" operation.
//!
//! One call runs the whole state machine: look up the factory, verify its
//! credentials, record the heartbeat, select and lease a request, resolve a
//! browser for it. Nothing is kept between calls.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

use super::model::{Assignment, Factory};
use super::resolver::{resolve, NoCompatibleBrowser};
use super::selector::JobSelector;
use super::store::{AuthError, Authenticator, DispatchStore, StoreError};

/// What happens to the lease when no browser can be resolved for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoBrowserPolicy {
    /// Leave the lease in place; the request returns to the pool after the
    /// TTL, which also throttles a factory that keeps failing on it.
    #[default]
    Keep,
    /// Clear the lease immediately so another factory can try right away.
    Release,
}

impl FromStr for NoBrowserPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "release" => Ok(Self::Release),
            other => Err(CoreError::Validation(format!(
                "Unknown no-browser policy '{other}'. Must be one of: keep, release"
            ))),
        }
    }
}

/// Successful poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A request was leased to the factory.
    Assigned(Assignment),
    /// Nothing the factory can serve right now. Not an error.
    NoWork,
}

/// Failed poll.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Factory '{0}' not found")]
    UnknownFactory(String),

    #[error(transparent)]
    Authentication(#[from] AuthError),

    /// A request was leased but none of the factory's browsers fits it.
    #[error(transparent)]
    NoMatchingBrowser(#[from] NoCompatibleBrowser),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Composes authentication, heartbeat, selection, leasing and resolution.
#[derive(Clone)]
pub struct PollHandler {
    store: Arc<dyn DispatchStore>,
    authenticator: Arc<dyn Authenticator>,
    selector: JobSelector,
    no_browser_policy: NoBrowserPolicy,
}

impl PollHandler {
    pub fn new(store: Arc<dyn DispatchStore>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            store,
            authenticator,
            selector: JobSelector::default(),
            no_browser_policy: NoBrowserPolicy::default(),
        }
    }

    pub fn with_selector(mut self, selector: JobSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_no_browser_policy(mut self, policy: NoBrowserPolicy) -> Self {
        self.no_browser_policy = policy;
        self
    }

    /// Look up a factory by name and verify its credentials.
    pub async fn authenticate(
        &self,
        factory_name: &str,
        credentials: &str,
    ) -> Result<Factory, PollError> {
        let factory = self
            .store
            .find_factory_by_name(factory_name)
            .await?
            .ok_or_else(|| PollError::UnknownFactory(factory_name.to_string()))?;

        self.authenticator.verify(&factory, credentials).await?;
        Ok(factory)
    }

    /// Run one poll for the factory called `factory_name`.
    pub async fn poll(
        &self,
        factory_name: &str,
        credentials: &str,
        remote_addr: IpAddr,
        now: Timestamp,
    ) -> Result<PollOutcome, PollError> {
        let store = self.store.as_ref();
        let factory = self.authenticate(factory_name, credentials).await?;

        store
            .record_poll(factory.id, now, &remote_addr.to_string())
            .await?;

        let browsers = store.list_active_browsers(factory.id).await?;
        let Some(request) = self.selector.select(store, &factory, &browsers, now).await? else {
            tracing::debug!(factory = %factory.name, "No matching request");
            return Ok(PollOutcome::NoWork);
        };

        // Fresh read: the inventory may have changed since selection.
        let browsers = store.list_active_browsers(factory.id).await?;
        let browser = match resolve(&request, &browsers) {
            Ok(browser) => browser,
            Err(err) => {
                tracing::warn!(
                    request_id = request.id,
                    factory = %factory.name,
                    policy = ?self.no_browser_policy,
                    "No matching browser for leased request",
                );
                if self.no_browser_policy == NoBrowserPolicy::Release {
                    self.selector
                        .leases()
                        .release(store, &request, &factory)
                        .await?;
                }
                return Err(err.into());
            }
        };

        let assignment = Assignment::new(&request, browser);
        tracing::info!(
            request_id = assignment.request,
            factory = %factory.name,
            browser = %assignment.browser,
            version = %assignment.version,
            "Request assigned",
        );
        Ok(PollOutcome::Assigned(assignment))
    }
}
