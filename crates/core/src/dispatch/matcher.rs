//! Feature matching between a request's capability predicate and what a
//! factory (or one of its browser variants) can offer.
//!
//! There is exactly one dimension rule, [`VersionConstraint::accepts`], and
//! one predicate check, [`matches`]. Request selection and browser
//! resolution both go through them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

use super::model::{BrowserVariant, CapabilityPredicate, Factory, ShotRequest};

/// Stored `mode` value for [`VersionConstraint::Unconstrained`].
pub const MODE_UNCONSTRAINED: i16 = 0;

/// Stored `mode` value for [`VersionConstraint::Exact`].
pub const MODE_EXACT: i16 = 1;

/// Stored `mode` value for [`VersionConstraint::AtLeast`].
pub const MODE_AT_LEAST: i16 = 2;

// ---------------------------------------------------------------------------
// Version constraint
// ---------------------------------------------------------------------------

/// Constraint on a single version dimension (major, minor, or a plugin).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionConstraint {
    /// Any value, including none at all.
    #[default]
    Unconstrained,
    /// Exactly this value.
    Exact(i32),
    /// This value or any higher one ("variant-or-better").
    AtLeast(i32),
}

impl VersionConstraint {
    /// Whether a concrete value satisfies this constraint.
    pub fn accepts(self, value: i32) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::Exact(v) => value == v,
            Self::AtLeast(v) => value >= v,
        }
    }

    /// Like [`accepts`](Self::accepts) for optional dimensions.
    ///
    /// A missing value only satisfies `Unconstrained`.
    pub fn accepts_optional(self, value: Option<i32>) -> bool {
        match value {
            Some(v) => self.accepts(v),
            None => self.is_unconstrained(),
        }
    }

    pub fn is_unconstrained(self) -> bool {
        matches!(self, Self::Unconstrained)
    }

    /// Rebuild a constraint from its `(mode, value)` storage columns.
    pub fn from_parts(mode: i16, value: Option<i32>) -> Result<Self, CoreError> {
        match (mode, value) {
            (MODE_UNCONSTRAINED, _) => Ok(Self::Unconstrained),
            (MODE_EXACT, Some(v)) => Ok(Self::Exact(v)),
            (MODE_AT_LEAST, Some(v)) => Ok(Self::AtLeast(v)),
            (MODE_EXACT | MODE_AT_LEAST, None) => Err(CoreError::Validation(format!(
                "Version constraint mode {mode} requires a value"
            ))),
            (other, _) => Err(CoreError::Validation(format!(
                "Unknown version constraint mode {other}"
            ))),
        }
    }

    /// Split into `(mode, value)` storage columns.
    pub fn to_parts(self) -> (i16, Option<i32>) {
        match self {
            Self::Unconstrained => (MODE_UNCONSTRAINED, None),
            Self::Exact(v) => (MODE_EXACT, Some(v)),
            Self::AtLeast(v) => (MODE_AT_LEAST, Some(v)),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability matching
// ---------------------------------------------------------------------------

/// The matchable shape of a browser variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub browser_group_id: i64,
    pub major: i32,
    pub minor: i32,
    pub javascript_id: Option<i32>,
    pub java_id: Option<i32>,
    pub flash_id: Option<i32>,
}

impl From<&BrowserVariant> for Capability {
    fn from(variant: &BrowserVariant) -> Self {
        Self {
            browser_group_id: variant.browser_group_id,
            major: variant.major,
            minor: variant.minor,
            javascript_id: variant.javascript_id,
            java_id: variant.java_id,
            flash_id: variant.flash_id,
        }
    }
}

/// Whether `candidate` satisfies every dimension of `predicate`.
pub fn matches(predicate: &CapabilityPredicate, candidate: &Capability) -> bool {
    let plugins = &predicate.plugins;
    predicate.browser_group_id == candidate.browser_group_id
        && predicate.major.accepts(candidate.major)
        && predicate.minor.accepts(candidate.minor)
        && plugins
            .javascript
            .constraint
            .accepts_optional(candidate.javascript_id)
        && plugins.java.constraint.accepts_optional(candidate.java_id)
        && plugins.flash.constraint.accepts_optional(candidate.flash_id)
}

/// Whether the factory's declared screen configuration can serve the request.
///
/// Width and height are each optional; whichever are set must fit one
/// declared size. Colour depth must be one of the declared depths. A request
/// without screen fields fits any factory.
pub fn screen_matches(request: &ShotRequest, factory: &Factory) -> bool {
    let size_ok = match (request.width, request.height) {
        (None, None) => true,
        (width, height) => factory.screen_sizes.iter().any(|size| {
            width.map_or(true, |w| w == size.width) && height.map_or(true, |h| h == size.height)
        }),
    };
    let depth_ok = request
        .bits_per_pixel
        .map_or(true, |bpp| factory.color_depths.contains(&bpp));
    size_ok && depth_ok
}

/// Whether a factory with the given capabilities can take the request at all.
pub fn factory_accepts(request: &ShotRequest, factory: &Factory, capabilities: &[Capability]) -> bool {
    screen_matches(request, factory)
        && capabilities
            .iter()
            .any(|capability| matches(&request.predicate, capability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::model::{PluginRequirement, PluginRequirements, ScreenSize};
    use chrono::Utc;

    fn predicate(major: VersionConstraint, minor: VersionConstraint) -> CapabilityPredicate {
        CapabilityPredicate {
            browser_group_id: 1,
            major,
            minor,
            plugins: PluginRequirements::default(),
        }
    }

    fn capability(major: i32, minor: i32) -> Capability {
        Capability {
            browser_group_id: 1,
            major,
            minor,
            javascript_id: None,
            java_id: None,
            flash_id: None,
        }
    }

    fn factory(sizes: &[(i32, i32)], depths: &[i32]) -> Factory {
        Factory {
            id: 1,
            name: "alpha".to_string(),
            password_hash: String::new(),
            ip_address: None,
            last_poll_at: None,
            screen_sizes: sizes
                .iter()
                .map(|&(width, height)| ScreenSize { width, height })
                .collect(),
            color_depths: depths.to_vec(),
            created_at: Utc::now(),
        }
    }

    fn request(width: Option<i32>, height: Option<i32>, bpp: Option<i32>) -> ShotRequest {
        let now = Utc::now();
        ShotRequest {
            id: 1,
            request_group_id: 1,
            predicate: predicate(VersionConstraint::Unconstrained, VersionConstraint::Unconstrained),
            width,
            height,
            bits_per_pixel: bpp,
            submitted_at: now,
            expires_at: now,
            completed_at: None,
            factory_id: None,
            locked_at: None,
        }
    }

    #[test]
    fn at_least_accepts_value_and_above() {
        let c = VersionConstraint::AtLeast(2);
        assert!(c.accepts(2));
        assert!(c.accepts(3));
        assert!(c.accepts(4));
        assert!(!c.accepts(1));
    }

    #[test]
    fn exact_accepts_only_value() {
        let c = VersionConstraint::Exact(3);
        assert!(c.accepts(3));
        assert!(!c.accepts(2));
        assert!(!c.accepts(4));
    }

    #[test]
    fn missing_optional_value_only_satisfies_unconstrained() {
        assert!(VersionConstraint::Unconstrained.accepts_optional(None));
        assert!(!VersionConstraint::Exact(3).accepts_optional(None));
        assert!(!VersionConstraint::AtLeast(3).accepts_optional(None));
        assert!(VersionConstraint::AtLeast(3).accepts_optional(Some(5)));
    }

    #[test]
    fn parts_round_trip_and_reject_bad_modes() {
        for c in [
            VersionConstraint::Unconstrained,
            VersionConstraint::Exact(7),
            VersionConstraint::AtLeast(2),
        ] {
            let (mode, value) = c.to_parts();
            assert_eq!(VersionConstraint::from_parts(mode, value).unwrap(), c);
        }
        assert!(VersionConstraint::from_parts(MODE_EXACT, None).is_err());
        assert!(VersionConstraint::from_parts(9, Some(1)).is_err());
    }

    #[test]
    fn serde_representation() {
        let json = serde_json::to_value(VersionConstraint::AtLeast(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "at_least": 3 }));
        let parsed: VersionConstraint = serde_json::from_str("\"unconstrained\"").unwrap();
        assert_eq!(parsed, VersionConstraint::Unconstrained);
    }

    #[test]
    fn predicate_requires_same_group() {
        let mut other = capability(3, 6);
        other.browser_group_id = 2;
        let p = predicate(VersionConstraint::Unconstrained, VersionConstraint::Unconstrained);
        assert!(matches(&p, &capability(3, 6)));
        assert!(!matches(&p, &other));
    }

    #[test]
    fn predicate_checks_every_version_dimension() {
        let p = predicate(VersionConstraint::AtLeast(3), VersionConstraint::Exact(6));
        assert!(matches(&p, &capability(3, 6)));
        assert!(matches(&p, &capability(4, 6)));
        assert!(!matches(&p, &capability(3, 5)));
        assert!(!matches(&p, &capability(2, 6)));
    }

    #[test]
    fn plugin_dimensions_are_independent() {
        let mut p = predicate(VersionConstraint::Unconstrained, VersionConstraint::Unconstrained);
        p.plugins.flash = PluginRequirement {
            constraint: VersionConstraint::AtLeast(9),
            version: "9".to_string(),
        };

        let mut cap = capability(3, 0);
        assert!(!matches(&p, &cap), "no flash at all");
        cap.flash_id = Some(10);
        assert!(matches(&p, &cap));
        cap.flash_id = Some(8);
        assert!(!matches(&p, &cap));
    }

    #[test]
    fn screen_fields_must_be_declared() {
        let f = factory(&[(1024, 768), (800, 600)], &[24]);
        assert!(screen_matches(&request(None, None, None), &f));
        assert!(screen_matches(&request(Some(800), None, None), &f));
        assert!(screen_matches(&request(Some(1024), Some(768), Some(24)), &f));
        assert!(!screen_matches(&request(Some(1024), Some(600), None), &f));
        assert!(!screen_matches(&request(None, None, Some(16)), &f));
    }

    #[test]
    fn factory_accepts_needs_one_matching_capability() {
        let f = factory(&[], &[]);
        let r = request(None, None, None);
        assert!(!factory_accepts(&r, &f, &[]));
        assert!(factory_accepts(&r, &f, &[capability(1, 0)]));
    }
}
