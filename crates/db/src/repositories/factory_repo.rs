//! Repository for the `factories` table.

use shotserver_core::dispatch::model::NewFactory;
use shotserver_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::factory::FactoryRow;

/// Column list for `factories` queries.
const COLUMNS: &str = "\
    id, name, password_hash, ip_address, last_poll_at, \
    screen_sizes, color_depths, created_at";

/// Provides lookup and heartbeat operations for screenshot factories.
pub struct FactoryRepo;

impl FactoryRepo {
    /// Register a factory. The name is stored lowercase.
    pub async fn create(pool: &PgPool, input: &NewFactory) -> Result<FactoryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO factories (name, password_hash, screen_sizes, color_depths) \
             VALUES (lower($1), $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FactoryRow>(&query)
            .bind(&input.name)
            .bind(&input.password_hash)
            .bind(Json(&input.screen_sizes))
            .bind(&input.color_depths)
            .fetch_one(pool)
            .await
    }

    /// Find a factory by name, ignoring case.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<FactoryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM factories WHERE name = lower($1)");
        sqlx::query_as::<_, FactoryRow>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Store the poll heartbeat. Returns `false` if the factory is gone.
    pub async fn record_poll(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
        ip_address: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE factories SET last_poll_at = $2, ip_address = $3 WHERE id = $1")
                .bind(id)
                .bind(at)
                .bind(ip_address)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
