//! Browser variant entity model.

use shotserver_core::dispatch::model::BrowserVariant;
use shotserver_core::types::DbId;
use sqlx::FromRow;

/// A row from `browsers` joined with its `browser_groups` name.
#[derive(Debug, Clone, FromRow)]
pub struct BrowserRow {
    pub id: DbId,
    pub factory_id: DbId,
    pub browser_group_id: DbId,
    pub browser_group: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
    pub command: String,
    pub active: bool,
    pub javascript_id: Option<i32>,
    pub java_id: Option<i32>,
    pub flash_id: Option<i32>,
}

impl From<BrowserRow> for BrowserVariant {
    fn from(row: BrowserRow) -> Self {
        Self {
            id: row.id,
            factory_id: row.factory_id,
            browser_group_id: row.browser_group_id,
            browser_group: row.browser_group,
            version: row.version,
            major: row.major,
            minor: row.minor,
            command: row.command,
            active: row.active,
            javascript_id: row.javascript_id,
            java_id: row.java_id,
            flash_id: row.flash_id,
        }
    }
}
