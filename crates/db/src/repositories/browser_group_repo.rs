//! Repository for the `browser_groups` lookup table.

use shotserver_core::types::DbId;
use sqlx::PgConnection;

/// Resolves browser group names (`firefox`, `msie`, ...) to ids.
pub struct BrowserGroupRepo;

impl BrowserGroupRepo {
    /// Return the id of the named group, creating it if it does not exist.
    ///
    /// Names are stored lowercase.
    pub async fn ensure(conn: &mut PgConnection, name: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO browser_groups (name) VALUES (lower(trim($1))) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(name)
        .fetch_one(conn)
        .await
    }
}
