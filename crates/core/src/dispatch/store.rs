//! Ports to the outside world: persistence and credential verification.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::model::{BrowserVariant, Factory, NewBrowser, NewFactory, NewRequestGroup, ShotRequest};

/// Failure reported by a [`DispatchStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or state conflict (e.g. duplicate factory name).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data could not be mapped onto domain types.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend itself failed (connection lost, query error, ...).
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Keyset position in the FIFO scan of eligible requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    pub submitted_at: Timestamp,
    pub id: DbId,
}

impl ScanCursor {
    pub fn after(request: &ShotRequest) -> Self {
        Self {
            submitted_at: request.submitted_at,
            id: request.id,
        }
    }
}

/// Filter for one page of eligible requests.
///
/// Implementations must return requests that are not completed, whose
/// group expires after `now`, whose lease is unset or was granted before
/// `stale_before`, and whose browser group is in `browser_group_ids`,
/// ordered by `(submitted_at, id)` ascending and strictly after `after`.
#[derive(Debug, Clone)]
pub struct EligibleQuery {
    pub now: Timestamp,
    pub stale_before: Timestamp,
    pub browser_group_ids: Vec<DbId>,
    pub after: Option<ScanCursor>,
    pub limit: i64,
}

/// Persistence operations needed by the dispatch components.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Look up a factory by name, ignoring case.
    async fn find_factory_by_name(&self, name: &str) -> Result<Option<Factory>, StoreError>;

    /// Persist the poll heartbeat.
    async fn record_poll(
        &self,
        factory_id: DbId,
        at: Timestamp,
        ip_address: &str,
    ) -> Result<(), StoreError>;

    /// Active browser variants of a factory.
    async fn list_active_browsers(&self, factory_id: DbId)
        -> Result<Vec<BrowserVariant>, StoreError>;

    /// One FIFO page of lease-eligible requests.
    async fn eligible_requests(&self, query: &EligibleQuery) -> Result<Vec<ShotRequest>, StoreError>;

    /// Lease a request in a single conditional write.
    ///
    /// Succeeds only if, at the moment of the write, the request is still
    /// not completed, not expired at `now`, and either unleased or leased
    /// before `stale_before`. Returns `None` when the condition fails.
    async fn try_lease(
        &self,
        request_id: DbId,
        factory_id: DbId,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<ShotRequest>, StoreError>;

    /// Clear the lease if `factory_id` still holds it. Returns whether it did.
    async fn release_lease(&self, request_id: DbId, factory_id: DbId) -> Result<bool, StoreError>;

    async fn find_request(&self, request_id: DbId) -> Result<Option<ShotRequest>, StoreError>;

    /// Find a request only if `factory_id` is its current lease holder.
    async fn find_leased_request(
        &self,
        request_id: DbId,
        factory_id: DbId,
    ) -> Result<Option<ShotRequest>, StoreError>;

    /// Set the completion marker if `factory_id` holds the lease.
    async fn mark_completed(
        &self,
        request_id: DbId,
        factory_id: DbId,
        at: Timestamp,
    ) -> Result<bool, StoreError>;

    async fn create_factory(&self, input: &NewFactory) -> Result<Factory, StoreError>;

    async fn add_browser(
        &self,
        factory_id: DbId,
        input: &NewBrowser,
    ) -> Result<BrowserVariant, StoreError>;

    /// Insert a request group and one request per requested browser.
    async fn submit_request_group(
        &self,
        input: &NewRequestGroup,
    ) -> Result<Vec<ShotRequest>, StoreError>;
}

/// Failure reported by an [`Authenticator`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials for factory '{0}'")]
    InvalidCredentials(String),

    #[error("Credential check failed: {0}")]
    Internal(String),
}

/// Verifies the credential token a factory sends with each poll.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, factory: &Factory, credentials: &str) -> Result<(), AuthError>;
}
