//! Picks the concrete browser a factory should use for a leased request.

use super::matcher::{matches, Capability};
use super::model::{BrowserVariant, ShotRequest};

/// No active browser variant of the factory satisfies the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No matching browser for request {request_id}")]
pub struct NoCompatibleBrowser {
    pub request_id: i64,
}

/// Resolve the browser for `request` among `variants`.
///
/// Inactive variants are ignored. When several match, the highest major
/// version wins, then the highest minor, then the lowest variant id.
pub fn resolve<'a>(
    request: &ShotRequest,
    variants: &'a [BrowserVariant],
) -> Result<&'a BrowserVariant, NoCompatibleBrowser> {
    variants
        .iter()
        .filter(|v| v.active && matches(&request.predicate, &Capability::from(*v)))
        .max_by(|a, b| {
            a.major
                .cmp(&b.major)
                .then(a.minor.cmp(&b.minor))
                .then(b.id.cmp(&a.id))
        })
        .ok_or(NoCompatibleBrowser {
            request_id: request.id,
        })
}
