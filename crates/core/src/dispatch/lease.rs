//! Time-bounded exclusive claims on requests.
//!
//! A lease is the `(factory_id, locked_at)` pair on a request. It is never
//! released on success; it simply goes stale once older than the TTL, at
//! which point any factory may lease the request again. Duplicate
//! processing after expiry is possible and is dealt with at upload time.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

use super::model::{Factory, ShotRequest};
use super::store::{DispatchStore, StoreError};

/// Default lease lifetime: five minutes.
pub const LEASE_TTL_SECS: u64 = 300;

/// Longest accepted lease lifetime: one day.
pub const MAX_LEASE_TTL_SECS: u64 = 24 * 60 * 60;

/// Result of a lease attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// The factory now holds the lease; carries the updated request.
    Granted(ShotRequest),
    /// Someone else leased, completed, or expired the request first.
    Conflict,
}

/// Grants and evaluates leases with a fixed TTL.
#[derive(Debug, Clone, Copy)]
pub struct LeaseManager {
    ttl: Duration,
}

impl Default for LeaseManager {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

impl LeaseManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Build a manager from a TTL in seconds, between 1 and
    /// [`MAX_LEASE_TTL_SECS`].
    pub fn from_secs(secs: u64) -> Result<Self, CoreError> {
        if !(1..=MAX_LEASE_TTL_SECS).contains(&secs) {
            return Err(CoreError::Validation(format!(
                "Lease TTL must be between 1 and {MAX_LEASE_TTL_SECS} seconds, got {secs}"
            )));
        }
        let ttl = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| CoreError::Validation(format!("Lease TTL {secs}s is out of range")))?;
        Ok(Self::new(ttl))
    }

    /// Leases granted strictly before this instant are stale at `now`.
    pub fn stale_before(&self, now: Timestamp) -> Timestamp {
        now - self.ttl
    }

    /// Whether the lease on `request` (if any) has lapsed at `now`.
    pub fn is_lease_eligible(&self, request: &ShotRequest, now: Timestamp) -> bool {
        match request.locked_at {
            None => true,
            Some(locked_at) => now - locked_at > self.ttl,
        }
    }

    /// Full eligibility: not completed, not expired, lease lapsed or unset.
    pub fn is_eligible(&self, request: &ShotRequest, now: Timestamp) -> bool {
        !request.is_completed() && !request.is_expired(now) && self.is_lease_eligible(request, now)
    }

    /// Try to lease `candidate` for `factory`.
    ///
    /// The store re-checks eligibility inside the write, so a stale
    /// `candidate` snapshot can only produce [`LeaseOutcome::Conflict`],
    /// never a double grant.
    pub async fn try_lease(
        &self,
        store: &dyn DispatchStore,
        candidate: &ShotRequest,
        factory: &Factory,
        now: Timestamp,
    ) -> Result<LeaseOutcome, StoreError> {
        let leased = store
            .try_lease(candidate.id, factory.id, now, self.stale_before(now))
            .await?;

        match leased {
            Some(request) => {
                tracing::debug!(
                    request_id = request.id,
                    factory = %factory.name,
                    previous_holder = ?candidate.factory_id,
                    "Lease granted",
                );
                Ok(LeaseOutcome::Granted(request))
            }
            None => {
                tracing::debug!(
                    request_id = candidate.id,
                    factory = %factory.name,
                    "Lease conflict, request taken by another factory",
                );
                Ok(LeaseOutcome::Conflict)
            }
        }
    }

    /// Drop the lease early if `factory` still holds it.
    pub async fn release(
        &self,
        store: &dyn DispatchStore,
        request: &ShotRequest,
        factory: &Factory,
    ) -> Result<bool, StoreError> {
        let released = store.release_lease(request.id, factory.id).await?;
        if released {
            tracing::info!(request_id = request.id, factory = %factory.name, "Lease released");
        }
        Ok(released)
    }
}
