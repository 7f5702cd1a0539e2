//! Factory entity model.

use shotserver_core::dispatch::model::{Factory, ScreenSize};
use shotserver_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `factories` table.
#[derive(Debug, Clone, FromRow)]
pub struct FactoryRow {
    pub id: DbId,
    pub name: String,
    pub password_hash: String,
    pub ip_address: Option<String>,
    pub last_poll_at: Option<Timestamp>,
    pub screen_sizes: Json<Vec<ScreenSize>>,
    pub color_depths: Vec<i32>,
    pub created_at: Timestamp,
}

impl From<FactoryRow> for Factory {
    fn from(row: FactoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            password_hash: row.password_hash,
            ip_address: row.ip_address,
            last_poll_at: row.last_poll_at,
            screen_sizes: row.screen_sizes.0,
            color_depths: row.color_depths,
            created_at: row.created_at,
        }
    }
}
