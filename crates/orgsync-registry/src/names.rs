//! Data source name validation.
//!
//! Valid names:
//! - Must be non-empty after trimming
//! - Must be at most [`MAX_NAME_LEN`] characters
//! - Must not contain control characters

use crate::error::{RegistryError, RegistryResult};

/// Maximum length of a data source name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Validate a data source name, returning the trimmed name if valid.
///
/// # Examples
///
/// ```
/// use orgsync_registry::names::validate_data_source_name;
///
/// assert_eq!(validate_data_source_name(" Pyramid ").unwrap(), "Pyramid");
/// assert!(validate_data_source_name("").is_err());
/// assert!(validate_data_source_name("bad\nname").is_err());
/// ```
pub fn validate_data_source_name(name: &str) -> RegistryResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(invalid(
            name,
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    if let Some(ch) = trimmed.chars().find(|c| c.is_control()) {
        return Err(invalid(name, format!("contains control character: {ch:?}")));
    }
    Ok(trimmed)
}

fn invalid(name: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}
