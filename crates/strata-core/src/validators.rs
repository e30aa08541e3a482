//! Developer-name validation.
//!
//! Content type and field developer names are restricted to
//! `[a-z][a-z0-9_]*` after case normalization. The SQL compiler relies on
//! this: validated names may appear inside JSON path expressions, so the
//! restriction is what keeps identifier interpolation injection-free.

use crate::exception::{Error, Result};

/// Case-normalize a developer name for lookup and storage.
pub fn normalize_name(name: &str) -> String {
	name.trim().to_ascii_lowercase()
}

/// Validate a (normalized) developer name.
///
/// # Examples
///
/// ```
/// use strata_core::validate_developer_name;
///
/// assert!(validate_developer_name("page_views").is_ok());
/// assert!(validate_developer_name("2fast").is_err());
/// assert!(validate_developer_name("drop table").is_err());
/// assert!(validate_developer_name("").is_err());
/// ```
pub fn validate_developer_name(name: &str) -> Result<()> {
	let mut chars = name.chars();
	let valid_head = chars
		.next()
		.is_some_and(|c| c.is_ascii_lowercase() || c == '_');
	let valid_tail = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

	if valid_head && valid_tail {
		Ok(())
	} else {
		Err(Error::InvalidName(name.to_string()))
	}
}
