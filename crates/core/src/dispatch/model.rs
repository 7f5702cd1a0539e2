//! Domain entities shared by the dispatch components and the store port.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

use super::matcher::VersionConstraint;

// ---------------------------------------------------------------------------
// Capability predicate
// ---------------------------------------------------------------------------

/// Requirement on one plugin dimension.
///
/// `version` is the label handed back to the factory; it is empty when the
/// request does not constrain the plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequirement {
    #[serde(default)]
    pub constraint: VersionConstraint,
    #[serde(default)]
    pub version: String,
}

/// Plugin requirements of a request group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequirements {
    #[serde(default)]
    pub javascript: PluginRequirement,
    #[serde(default)]
    pub java: PluginRequirement,
    #[serde(default)]
    pub flash: PluginRequirement,
}

/// What a request needs from a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityPredicate {
    pub browser_group_id: DbId,
    pub major: VersionConstraint,
    pub minor: VersionConstraint,
    pub plugins: PluginRequirements,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A pending (or finished) screenshot request.
///
/// Submission time and expiry belong to the request group and are copied
/// onto each request when it is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShotRequest {
    pub id: DbId,
    pub request_group_id: DbId,
    pub predicate: CapabilityPredicate,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub submitted_at: Timestamp,
    pub expires_at: Timestamp,
    /// Completion marker, set once a screenshot has been uploaded.
    pub completed_at: Option<Timestamp>,
    /// Current lease holder.
    pub factory_id: Option<DbId>,
    /// When the current lease was granted.
    pub locked_at: Option<Timestamp>,
}

impl ShotRequest {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Whether the lease, if any, is held by `factory_id`.
    pub fn is_leased_by(&self, factory_id: DbId) -> bool {
        self.factory_id == Some(factory_id) && self.locked_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Factories and browsers
// ---------------------------------------------------------------------------

/// A screen resolution a factory can render at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

/// A polling screenshot factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Factory {
    pub id: DbId,
    /// Lowercase identifier, normally the host name.
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Address of the most recent poll.
    pub ip_address: Option<String>,
    pub last_poll_at: Option<Timestamp>,
    pub screen_sizes: Vec<ScreenSize>,
    pub color_depths: Vec<i32>,
    pub created_at: Timestamp,
}

/// A concrete browser installation registered by a factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserVariant {
    pub id: DbId,
    pub factory_id: DbId,
    pub browser_group_id: DbId,
    /// Browser group display name, e.g. `firefox`.
    pub browser_group: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
    /// Command line to start the browser; empty means the default.
    pub command: String,
    pub active: bool,
    pub javascript_id: Option<i32>,
    pub java_id: Option<i32>,
    pub flash_id: Option<i32>,
}

// ---------------------------------------------------------------------------
// Poll result
// ---------------------------------------------------------------------------

/// Everything a factory needs to run one leased request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub request: DbId,
    pub browser: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
    pub command: String,
    pub width: i32,
    pub height: i32,
    pub bpp: i32,
    pub javascript: String,
    pub java: String,
    pub flash: String,
}

impl Assignment {
    /// Combine a leased request with the browser resolved for it.
    ///
    /// Unset screen fields become 0 (unconstrained).
    pub fn new(request: &ShotRequest, browser: &BrowserVariant) -> Self {
        let plugins = &request.predicate.plugins;
        Self {
            request: request.id,
            browser: browser.browser_group.clone(),
            version: browser.version.clone(),
            major: browser.major,
            minor: browser.minor,
            command: browser.command.clone(),
            width: request.width.unwrap_or(0),
            height: request.height.unwrap_or(0),
            bpp: request.bits_per_pixel.unwrap_or(0),
            javascript: plugin_label(&plugins.javascript),
            java: plugin_label(&plugins.java),
            flash: plugin_label(&plugins.flash),
        }
    }
}

fn plugin_label(requirement: &PluginRequirement) -> String {
    if requirement.constraint.is_unconstrained() {
        String::new()
    } else {
        requirement.version.clone()
    }
}

// ---------------------------------------------------------------------------
// Creation DTOs
// ---------------------------------------------------------------------------

/// Input for registering a factory. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewFactory {
    pub name: String,
    pub password_hash: String,
    pub screen_sizes: Vec<ScreenSize>,
    pub color_depths: Vec<i32>,
}

/// Input for registering a browser variant on a factory.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBrowser {
    /// Browser group name; created on first use.
    pub browser_group: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
    pub command: Option<String>,
    pub active: Option<bool>,
    pub javascript_id: Option<i32>,
    pub java_id: Option<i32>,
    pub flash_id: Option<i32>,
}

/// One browser requested within a group.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestedBrowser {
    pub browser_group: String,
    #[serde(default)]
    pub major: VersionConstraint,
    #[serde(default)]
    pub minor: VersionConstraint,
}

/// Input for submitting a request group; one request is created per browser.
#[derive(Debug, Clone)]
pub struct NewRequestGroup {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub plugins: PluginRequirements,
    pub submitted_at: Timestamp,
    pub expires_at: Timestamp,
    pub browsers: Vec<RequestedBrowser>,
}
