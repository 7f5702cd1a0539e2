//! Request entity model.
//!
//! A request row is always read together with its request group, which
//! carries the screen configuration, plugin requirements, submission time
//! and expiry.

use shotserver_core::dispatch::model::{
    CapabilityPredicate, PluginRequirement, PluginRequirements, ShotRequest,
};
use shotserver_core::dispatch::VersionConstraint;
use shotserver_core::error::CoreError;
use shotserver_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `requests r JOIN request_groups g`.
#[derive(Debug, Clone, FromRow)]
pub struct RequestRow {
    pub id: DbId,
    pub request_group_id: DbId,
    pub browser_group_id: DbId,
    pub major_mode: i16,
    pub major: Option<i32>,
    pub minor_mode: i16,
    pub minor: Option<i32>,
    pub javascript_mode: i16,
    pub javascript_value: Option<i32>,
    pub javascript_version: String,
    pub java_mode: i16,
    pub java_value: Option<i32>,
    pub java_version: String,
    pub flash_mode: i16,
    pub flash_value: Option<i32>,
    pub flash_version: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub submitted_at: Timestamp,
    pub expire_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub factory_id: Option<DbId>,
    pub locked_at: Option<Timestamp>,
}

fn plugin(mode: i16, value: Option<i32>, version: String) -> Result<PluginRequirement, CoreError> {
    Ok(PluginRequirement {
        constraint: VersionConstraint::from_parts(mode, value)?,
        version,
    })
}

impl TryFrom<RequestRow> for ShotRequest {
    type Error = CoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            request_group_id: row.request_group_id,
            predicate: CapabilityPredicate {
                browser_group_id: row.browser_group_id,
                major: VersionConstraint::from_parts(row.major_mode, row.major)?,
                minor: VersionConstraint::from_parts(row.minor_mode, row.minor)?,
                plugins: PluginRequirements {
                    javascript: plugin(
                        row.javascript_mode,
                        row.javascript_value,
                        row.javascript_version,
                    )?,
                    java: plugin(row.java_mode, row.java_value, row.java_version)?,
                    flash: plugin(row.flash_mode, row.flash_value, row.flash_version)?,
                },
            },
            width: row.width,
            height: row.height,
            bits_per_pixel: row.bits_per_pixel,
            submitted_at: row.submitted_at,
            expires_at: row.expire_at,
            completed_at: row.completed_at,
            factory_id: row.factory_id,
            locked_at: row.locked_at,
        })
    }
}
