//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Longest site identifier accepted from the capture tool.
pub const MAX_SITE_LEN: usize = 2048;

/// Validates username format.
///
/// Requirements:
/// - Only alphanumeric characters, underscores, dots and hyphens
/// - 1-50 characters in length
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() || username.chars().count() > 50 {
        return Err(ValidationError::new("username_invalid_length"));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::new("username_invalid_characters"));
    }

    Ok(())
}

/// Validates the site identifier attached to an interaction batch.
pub fn validate_site(site: &str) -> Result<(), ValidationError> {
    if site.trim().is_empty() {
        return Err(ValidationError::new("site_required"));
    }
    if site.chars().count() > MAX_SITE_LEN {
        return Err(ValidationError::new("site_too_long"));
    }
    Ok(())
}
