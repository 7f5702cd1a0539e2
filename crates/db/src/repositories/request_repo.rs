//! Repository for the `requests` table.
//!
//! Every read joins `request_groups`, so rows carry the full predicate and
//! lifetime of the request. Lease changes are single conditional `UPDATE`s;
//! the row lock taken by the update makes concurrent claims serialize, and
//! the loser's re-evaluated `WHERE` clause no longer matches.

use shotserver_core::dispatch::store::EligibleQuery;
use shotserver_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::request::RequestRow;

/// Column list for `requests r JOIN request_groups g` queries.
pub(crate) const COLUMNS: &str = "\
    r.id, r.request_group_id, r.browser_group_id, \
    r.major_mode, r.major, r.minor_mode, r.minor, \
    g.javascript_mode, g.javascript_value, g.javascript_version, \
    g.java_mode, g.java_value, g.java_version, \
    g.flash_mode, g.flash_value, g.flash_version, \
    g.width, g.height, g.bits_per_pixel, \
    g.submitted_at, g.expire_at, \
    r.completed_at, r.factory_id, r.locked_at";

/// Provides queueing and lease operations for screenshot requests.
pub struct RequestRepo;

impl RequestRepo {
    /// One FIFO page of lease-eligible requests, keyset-paged by
    /// `(submitted_at, id)`.
    pub async fn eligible(pool: &PgPool, query: &EligibleQuery) -> Result<Vec<RequestRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM requests r \
             JOIN request_groups g ON g.id = r.request_group_id \
             WHERE r.completed_at IS NULL \
               AND g.expire_at > $1 \
               AND (r.locked_at IS NULL OR r.locked_at < $2) \
               AND r.browser_group_id = ANY($3) \
               AND ($4::timestamptz IS NULL OR (g.submitted_at, r.id) > ($4::timestamptz, $5::bigint)) \
             ORDER BY g.submitted_at ASC, r.id ASC \
             LIMIT $6"
        );
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(query.now)
            .bind(query.stale_before)
            .bind(&query.browser_group_ids)
            .bind(query.after.map(|c| c.submitted_at))
            .bind(query.after.map(|c| c.id))
            .bind(query.limit)
            .fetch_all(pool)
            .await
    }

    /// Lease a request to a factory if it is still open, unexpired, and
    /// unleased or stale. Returns the leased row, or `None` if the
    /// condition did not hold at write time.
    pub async fn try_lease(
        pool: &PgPool,
        request_id: DbId,
        factory_id: DbId,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<RequestRow>, sqlx::Error> {
        let query = format!(
            "UPDATE requests r \
             SET factory_id = $2, locked_at = $3 \
             FROM request_groups g \
             WHERE g.id = r.request_group_id \
               AND r.id = $1 \
               AND r.completed_at IS NULL \
               AND g.expire_at > $3 \
               AND (r.locked_at IS NULL OR r.locked_at < $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RequestRow>(&query)
            .bind(request_id)
            .bind(factory_id)
            .bind(now)
            .bind(stale_before)
            .fetch_optional(pool)
            .await
    }

    /// Clear a lease held by `factory_id`. Returns whether a lease was cleared.
    pub async fn release(pool: &PgPool, request_id: DbId, factory_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE requests SET factory_id = NULL, locked_at = NULL \
             WHERE id = $1 AND factory_id = $2 AND locked_at IS NOT NULL",
        )
        .bind(request_id)
        .bind(factory_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM requests r \
             JOIN request_groups g ON g.id = r.request_group_id \
             WHERE r.id = $1"
        );
        sqlx::query_as::<_, RequestRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a request only while `factory_id` holds its lease.
    pub async fn find_leased(
        pool: &PgPool,
        id: DbId,
        factory_id: DbId,
    ) -> Result<Option<RequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM requests r \
             JOIN request_groups g ON g.id = r.request_group_id \
             WHERE r.id = $1 AND r.factory_id = $2 AND r.locked_at IS NOT NULL"
        );
        sqlx::query_as::<_, RequestRow>(&query)
            .bind(id)
            .bind(factory_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the completion marker if `factory_id` holds the lease and the
    /// request is not already completed.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        factory_id: DbId,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE requests SET completed_at = $3 \
             WHERE id = $1 AND factory_id = $2 AND locked_at IS NOT NULL \
               AND completed_at IS NULL",
        )
        .bind(id)
        .bind(factory_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
