//! FIFO selection of the next request a factory can serve.

use crate::types::{DbId, Timestamp};

use super::lease::{LeaseManager, LeaseOutcome};
use super::matcher::{factory_accepts, Capability};
use super::model::{BrowserVariant, Factory, ShotRequest};
use super::store::{DispatchStore, EligibleQuery, ScanCursor, StoreError};

/// Default number of eligible requests fetched per scan page.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Finds the oldest compatible request and leases it in one step.
#[derive(Debug, Clone, Copy)]
pub struct JobSelector {
    leases: LeaseManager,
    page_size: i64,
}

impl JobSelector {
    pub fn new(leases: LeaseManager, page_size: i64) -> Self {
        Self {
            leases,
            page_size: page_size.max(1),
        }
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    /// Lease the oldest eligible request that `factory` can serve with
    /// `browsers`, or return `None` when there is none.
    ///
    /// Requests are visited in `(submitted_at, id)` order. A candidate lost
    /// to a concurrent poll is skipped and the scan moves on, so an older
    /// request is always tried before a younger one.
    pub async fn select(
        &self,
        store: &dyn DispatchStore,
        factory: &Factory,
        browsers: &[BrowserVariant],
        now: Timestamp,
    ) -> Result<Option<ShotRequest>, StoreError> {
        let capabilities: Vec<Capability> = browsers.iter().map(Capability::from).collect();
        if capabilities.is_empty() {
            return Ok(None);
        }

        let mut browser_group_ids: Vec<DbId> =
            capabilities.iter().map(|c| c.browser_group_id).collect();
        browser_group_ids.sort_unstable();
        browser_group_ids.dedup();

        let mut query = EligibleQuery {
            now,
            stale_before: self.leases.stale_before(now),
            browser_group_ids,
            after: None,
            limit: self.page_size,
        };

        loop {
            let page = store.eligible_requests(&query).await?;
            let cursor = match page.last() {
                Some(last) => ScanCursor::after(last),
                None => return Ok(None),
            };

            for candidate in &page {
                if !factory_accepts(candidate, factory, &capabilities) {
                    continue;
                }
                match self.leases.try_lease(store, candidate, factory, now).await? {
                    LeaseOutcome::Granted(request) => return Ok(Some(request)),
                    LeaseOutcome::Conflict => continue,
                }
            }

            if (page.len() as i64) < query.limit {
                return Ok(None);
            }
            query.after = Some(cursor);
        }
    }
}

impl Default for JobSelector {
    fn default() -> Self {
        Self::new(LeaseManager::default(), DEFAULT_PAGE_SIZE)
    }
}
