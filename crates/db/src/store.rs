//! PostgreSQL implementation of the core [`DispatchStore`] port.

use async_trait::async_trait;
use shotserver_core::dispatch::model::{
    BrowserVariant, Factory, NewBrowser, NewFactory, NewRequestGroup, ShotRequest,
};
use shotserver_core::dispatch::store::{DispatchStore, EligibleQuery, StoreError};
use shotserver_core::error::CoreError;
use shotserver_core::types::{DbId, Timestamp};

use crate::models::request::RequestRow;
use crate::repositories::{BrowserRepo, FactoryRepo, RequestGroupRepo, RequestRepo};
use crate::DbPool;

/// SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Dispatch store backed by a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgDispatchStore {
    pool: DbPool,
}

impl PgDispatchStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a sqlx error onto the store error taxonomy.
///
/// Unique violations on `uq_*` constraints become conflicts; everything else
/// is a backend failure.
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return StoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    StoreError::Backend(Box::new(err))
}

fn to_requests(rows: Vec<RequestRow>) -> Result<Vec<ShotRequest>, StoreError> {
    rows.into_iter()
        .map(|row| ShotRequest::try_from(row).map_err(StoreError::from))
        .collect()
}

fn to_request(row: Option<RequestRow>) -> Result<Option<ShotRequest>, StoreError> {
    row.map(ShotRequest::try_from)
        .transpose()
        .map_err(StoreError::from)
}

#[async_trait]
impl DispatchStore for PgDispatchStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }

    async fn find_factory_by_name(&self, name: &str) -> Result<Option<Factory>, StoreError> {
        let row = FactoryRepo::find_by_name(&self.pool, name)
            .await
            .map_err(store_error)?;
        Ok(row.map(Factory::from))
    }

    async fn record_poll(
        &self,
        factory_id: DbId,
        at: Timestamp,
        ip_address: &str,
    ) -> Result<(), StoreError> {
        let updated = FactoryRepo::record_poll(&self.pool, factory_id, at, ip_address)
            .await
            .map_err(store_error)?;
        if !updated {
            return Err(CoreError::NotFound {
                entity: "Factory",
                id: factory_id,
            }
            .into());
        }
        Ok(())
    }

    async fn list_active_browsers(
        &self,
        factory_id: DbId,
    ) -> Result<Vec<BrowserVariant>, StoreError> {
        let rows = BrowserRepo::list_active(&self.pool, factory_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(BrowserVariant::from).collect())
    }

    async fn eligible_requests(&self, query: &EligibleQuery) -> Result<Vec<ShotRequest>, StoreError> {
        if query.browser_group_ids.is_empty() || query.limit <= 0 {
            return Ok(Vec::new());
        }
        let rows = RequestRepo::eligible(&self.pool, query)
            .await
            .map_err(store_error)?;
        to_requests(rows)
    }

    async fn try_lease(
        &self,
        request_id: DbId,
        factory_id: DbId,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<ShotRequest>, StoreError> {
        let row = RequestRepo::try_lease(&self.pool, request_id, factory_id, now, stale_before)
            .await
            .map_err(store_error)?;
        to_request(row)
    }

    async fn release_lease(&self, request_id: DbId, factory_id: DbId) -> Result<bool, StoreError> {
        RequestRepo::release(&self.pool, request_id, factory_id)
            .await
            .map_err(store_error)
    }

    async fn find_request(&self, request_id: DbId) -> Result<Option<ShotRequest>, StoreError> {
        let row = RequestRepo::find_by_id(&self.pool, request_id)
            .await
            .map_err(store_error)?;
        to_request(row)
    }

    async fn find_leased_request(
        &self,
        request_id: DbId,
        factory_id: DbId,
    ) -> Result<Option<ShotRequest>, StoreError> {
        let row = RequestRepo::find_leased(&self.pool, request_id, factory_id)
            .await
            .map_err(store_error)?;
        to_request(row)
    }

    async fn mark_completed(
        &self,
        request_id: DbId,
        factory_id: DbId,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        RequestRepo::mark_completed(&self.pool, request_id, factory_id, at)
            .await
            .map_err(store_error)
    }

    async fn create_factory(&self, input: &NewFactory) -> Result<Factory, StoreError> {
        let row = FactoryRepo::create(&self.pool, input)
            .await
            .map_err(store_error)?;
        Ok(row.into())
    }

    async fn add_browser(
        &self,
        factory_id: DbId,
        input: &NewBrowser,
    ) -> Result<BrowserVariant, StoreError> {
        let row = BrowserRepo::create(&self.pool, factory_id, input)
            .await
            .map_err(|err| {
                let missing_factory = matches!(
                    &err,
                    sqlx::Error::Database(db_err)
                        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
                );
                if missing_factory {
                    return StoreError::Core(CoreError::NotFound {
                        entity: "Factory",
                        id: factory_id,
                    });
                }
                store_error(err)
            })?;
        Ok(row.into())
    }

    async fn submit_request_group(
        &self,
        input: &NewRequestGroup,
    ) -> Result<Vec<ShotRequest>, StoreError> {
        let rows = RequestGroupRepo::submit(&self.pool, input)
            .await
            .map_err(store_error)?;
        to_requests(rows)
    }
}
