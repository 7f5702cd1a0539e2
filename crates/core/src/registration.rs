//! Validation for factory registration and request submission.
//!
//! Pure functions used by the API before anything reaches the store.

use crate::dispatch::matcher::VersionConstraint;
use crate::dispatch::model::{
    NewBrowser, PluginRequirement, PluginRequirements, RequestedBrowser, ScreenSize,
};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default lifetime of a request group, in minutes.
pub const DEFAULT_EXPIRE_MINUTES: i64 = 30;

/// Longest a request group may stay in the queue, in minutes.
pub const MAX_EXPIRE_MINUTES: i64 = 24 * 60;

/// Maximum number of browsers in one request group.
pub const MAX_BROWSERS_PER_GROUP: usize = 100;

/// Colour depths a screen may declare.
pub const VALID_COLOR_DEPTHS: &[i32] = &[1, 4, 8, 15, 16, 24, 32];

/// Maximum length of a factory name.
const MAX_NAME_LEN: usize = 64;

/// Largest accepted screen dimension, in pixels.
const MAX_SCREEN_DIMENSION: i32 = 16_384;

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Validate a factory name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_factory_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Factory name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Factory name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Factory name may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate declared screen sizes and colour depths.
pub fn validate_screens(sizes: &[ScreenSize], depths: &[i32]) -> Result<(), CoreError> {
    for size in sizes {
        validate_dimension("width", Some(size.width))?;
        validate_dimension("height", Some(size.height))?;
    }
    for depth in depths {
        validate_color_depth(Some(*depth))?;
    }
    Ok(())
}

/// Validate a browser variant before registration.
pub fn validate_browser(input: &NewBrowser) -> Result<(), CoreError> {
    if input.browser_group.trim().is_empty() {
        return Err(CoreError::Validation(
            "Browser group must not be empty".to_string(),
        ));
    }
    if input.version.trim().is_empty() {
        return Err(CoreError::Validation(
            "Browser version must not be empty".to_string(),
        ));
    }
    if input.major < 0 || input.minor < 0 {
        return Err(CoreError::Validation(
            "Browser major and minor versions must not be negative".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request groups
// ---------------------------------------------------------------------------

/// Validate the screen fields of a request group.
pub fn validate_request_screen(
    width: Option<i32>,
    height: Option<i32>,
    bits_per_pixel: Option<i32>,
) -> Result<(), CoreError> {
    validate_dimension("width", width)?;
    validate_dimension("height", height)?;
    validate_color_depth(bits_per_pixel)
}

/// Validate the browser list of a request group.
pub fn validate_requested_browsers(browsers: &[RequestedBrowser]) -> Result<(), CoreError> {
    if browsers.is_empty() {
        return Err(CoreError::Validation(
            "At least one browser must be requested".to_string(),
        ));
    }
    if browsers.len() > MAX_BROWSERS_PER_GROUP {
        return Err(CoreError::Validation(format!(
            "At most {MAX_BROWSERS_PER_GROUP} browsers may be requested at once"
        )));
    }
    if let Some(i) = browsers
        .iter()
        .position(|b| b.browser_group.trim().is_empty())
    {
        return Err(CoreError::Validation(format!(
            "Browser group at index {i} must not be empty"
        )));
    }
    Ok(())
}

/// Validate the plugin requirements of a request group.
///
/// A constrained plugin needs a non-negative value and a version label to
/// report back to the factory. Unconstrained plugins report nothing.
pub fn validate_plugins(plugins: &PluginRequirements) -> Result<(), CoreError> {
    validate_plugin("javascript", &plugins.javascript)?;
    validate_plugin("java", &plugins.java)?;
    validate_plugin("flash", &plugins.flash)
}

fn validate_plugin(name: &str, plugin: &PluginRequirement) -> Result<(), CoreError> {
    let value = match plugin.constraint {
        VersionConstraint::Unconstrained => return Ok(()),
        VersionConstraint::Exact(v) | VersionConstraint::AtLeast(v) => v,
    };
    if value < 0 {
        return Err(CoreError::Validation(format!(
            "Plugin {name} version id must not be negative"
        )));
    }
    if plugin.version.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "Plugin {name} is constrained but has no version label"
        )));
    }
    Ok(())
}

/// Validate a request group lifetime in minutes.
pub fn validate_expire_minutes(minutes: i64) -> Result<(), CoreError> {
    if !(1..=MAX_EXPIRE_MINUTES).contains(&minutes) {
        return Err(CoreError::Validation(format!(
            "Expiry must be between 1 and {MAX_EXPIRE_MINUTES} minutes"
        )));
    }
    Ok(())
}

fn validate_dimension(field: &str, value: Option<i32>) -> Result<(), CoreError> {
    match value {
        Some(v) if !(1..=MAX_SCREEN_DIMENSION).contains(&v) => Err(CoreError::Validation(
            format!("Screen {field} must be between 1 and {MAX_SCREEN_DIMENSION}"),
        )),
        _ => Ok(()),
    }
}

fn validate_color_depth(value: Option<i32>) -> Result<(), CoreError> {
    match value {
        Some(v) if !VALID_COLOR_DEPTHS.contains(&v) => Err(CoreError::Validation(format!(
            "Invalid colour depth {v}. Must be one of: {VALID_COLOR_DEPTHS:?}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(group: &str) -> RequestedBrowser {
        RequestedBrowser {
            browser_group: group.to_string(),
            major: VersionConstraint::Unconstrained,
            minor: VersionConstraint::Unconstrained,
        }
    }

    #[test]
    fn factory_names() {
        assert!(validate_factory_name("alpha").is_ok());
        assert!(validate_factory_name("shot-01.example").is_ok());
        assert!(validate_factory_name("").is_err());
        assert!(validate_factory_name("has space").is_err());
        assert!(validate_factory_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn screen_values() {
        assert!(validate_request_screen(None, None, None).is_ok());
        assert!(validate_request_screen(Some(1024), Some(768), Some(24)).is_ok());
        assert!(validate_request_screen(Some(0), None, None).is_err());
        assert!(validate_request_screen(None, None, Some(12)).is_err());
        assert!(validate_screens(&[ScreenSize { width: 800, height: 600 }], &[16, 24]).is_ok());
        assert!(validate_screens(&[ScreenSize { width: -1, height: 600 }], &[]).is_err());
    }

    #[test]
    fn requested_browsers() {
        assert!(validate_requested_browsers(&[]).is_err());
        assert!(validate_requested_browsers(&[requested("firefox")]).is_ok());
        let err = validate_requested_browsers(&[requested("firefox"), requested(" ")]).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn plugin_requirements() {
        let constrained = |constraint, version: &str| PluginRequirement {
            constraint,
            version: version.to_string(),
        };

        assert!(validate_plugins(&PluginRequirements::default()).is_ok());

        let mut plugins = PluginRequirements::default();
        plugins.flash = constrained(VersionConstraint::Exact(10), "9.0r115");
        plugins.javascript = constrained(VersionConstraint::Unconstrained, "1.8");
        assert!(validate_plugins(&plugins).is_ok());

        plugins.flash = constrained(VersionConstraint::Exact(10), "");
        let err = validate_plugins(&plugins).unwrap_err();
        assert!(err.to_string().contains("flash"));

        plugins.flash = PluginRequirement::default();
        plugins.java = constrained(VersionConstraint::AtLeast(-1), "1.6");
        let err = validate_plugins(&plugins).unwrap_err();
        assert!(err.to_string().contains("java"));
    }

    #[test]
    fn expire_bounds() {
        assert!(validate_expire_minutes(DEFAULT_EXPIRE_MINUTES).is_ok());
        assert!(validate_expire_minutes(0).is_err());
        assert!(validate_expire_minutes(MAX_EXPIRE_MINUTES + 1).is_err());
    }
}
