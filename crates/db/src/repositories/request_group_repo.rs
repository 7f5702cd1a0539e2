//! Repository for the `request_groups` table.

use shotserver_core::dispatch::model::NewRequestGroup;
use shotserver_core::types::DbId;
use sqlx::PgPool;

use super::request_repo::COLUMNS;
use super::BrowserGroupRepo;
use crate::models::request::RequestRow;

/// Submits screenshot request groups.
pub struct RequestGroupRepo;

impl RequestGroupRepo {
    /// Insert a request group and one request per requested browser in a
    /// single transaction. Returns the created requests in input order.
    pub async fn submit(pool: &PgPool, input: &NewRequestGroup) -> Result<Vec<RequestRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (js_mode, js_value) = input.plugins.javascript.constraint.to_parts();
        let (java_mode, java_value) = input.plugins.java.constraint.to_parts();
        let (flash_mode, flash_value) = input.plugins.flash.constraint.to_parts();

        let group_id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO request_groups \
                (width, height, bits_per_pixel, \
                 javascript_mode, javascript_value, javascript_version, \
                 java_mode, java_value, java_version, \
                 flash_mode, flash_value, flash_version, \
                 submitted_at, expire_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING id",
        )
        .bind(input.width)
        .bind(input.height)
        .bind(input.bits_per_pixel)
        .bind(js_mode)
        .bind(js_value)
        .bind(&input.plugins.javascript.version)
        .bind(java_mode)
        .bind(java_value)
        .bind(&input.plugins.java.version)
        .bind(flash_mode)
        .bind(flash_value)
        .bind(&input.plugins.flash.version)
        .bind(input.submitted_at)
        .bind(input.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        let insert = format!(
            "WITH r AS ( \
                 INSERT INTO requests \
                     (request_group_id, browser_group_id, major_mode, major, minor_mode, minor) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM r JOIN request_groups g ON g.id = r.request_group_id"
        );

        let mut created = Vec::with_capacity(input.browsers.len());
        for wanted in &input.browsers {
            let browser_group_id = BrowserGroupRepo::ensure(&mut tx, &wanted.browser_group).await?;
            let (major_mode, major) = wanted.major.to_parts();
            let (minor_mode, minor) = wanted.minor.to_parts();
            let row = sqlx::query_as::<_, RequestRow>(&insert)
                .bind(group_id)
                .bind(browser_group_id)
                .bind(major_mode)
                .bind(major)
                .bind(minor_mode)
                .bind(minor)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }
}
