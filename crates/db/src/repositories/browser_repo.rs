//! Repository for the `browsers` table.

use shotserver_core::dispatch::model::NewBrowser;
use shotserver_core::types::DbId;
use sqlx::PgPool;

use super::BrowserGroupRepo;
use crate::models::browser::BrowserRow;

/// Column list for `browsers b JOIN browser_groups bg` queries.
const COLUMNS: &str = "\
    b.id, b.factory_id, b.browser_group_id, bg.name AS browser_group, \
    b.version, b.major, b.minor, b.command, b.active, \
    b.javascript_id, b.java_id, b.flash_id";

/// Provides access to the browser variants installed on factories.
pub struct BrowserRepo;

impl BrowserRepo {
    /// Active browser variants of a factory, oldest first.
    pub async fn list_active(pool: &PgPool, factory_id: DbId) -> Result<Vec<BrowserRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM browsers b \
             JOIN browser_groups bg ON bg.id = b.browser_group_id \
             WHERE b.factory_id = $1 AND b.active \
             ORDER BY b.id"
        );
        sqlx::query_as::<_, BrowserRow>(&query)
            .bind(factory_id)
            .fetch_all(pool)
            .await
    }

    /// Register a browser variant on a factory, creating its group if needed.
    pub async fn create(
        pool: &PgPool,
        factory_id: DbId,
        input: &NewBrowser,
    ) -> Result<BrowserRow, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let browser_group_id = BrowserGroupRepo::ensure(&mut tx, &input.browser_group).await?;

        let id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO browsers \
                (factory_id, browser_group_id, version, major, minor, command, active, \
                 javascript_id, java_id, flash_id) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, ''), COALESCE($7, true), $8, $9, $10) \
             RETURNING id",
        )
        .bind(factory_id)
        .bind(browser_group_id)
        .bind(&input.version)
        .bind(input.major)
        .bind(input.minor)
        .bind(&input.command)
        .bind(input.active)
        .bind(input.javascript_id)
        .bind(input.java_id)
        .bind(input.flash_id)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM browsers b \
             JOIN browser_groups bg ON bg.id = b.browser_group_id \
             WHERE b.id = $1"
        );
        let row = sqlx::query_as::<_, BrowserRow>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Toggle the `active` flag. Returns `false` if the browser does not exist.
    pub async fn set_active(pool: &PgPool, id: DbId, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE browsers SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
