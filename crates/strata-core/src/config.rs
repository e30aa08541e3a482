//! Engine configuration.

use serde::Deserialize;

/// Tunables shared by every query the engine compiles.
///
/// The struct is deserializable so a surrounding service can load it from
/// its settings source; all fields have working defaults.
///
/// # Examples
///
/// ```
/// use strata_core::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_date_format("%Y-%m-%d %H:%M")
///     .with_default_page_size(50);
/// assert_eq!(config.date_format, "%Y-%m-%d %H:%M");
/// assert_eq!(config.default_page_size, 50);
/// assert_eq!(config.max_page_size, 200); // Default value
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// strftime-style format applied to date values before comparison, so
	/// date filters stay format-stable across locales. Translated to the
	/// backend dialect's format grammar at compile time.
	pub date_format: String,
	/// Page size used when a request does not carry one.
	pub default_page_size: i64,
	/// Hard ceiling on the page size a caller may request.
	pub max_page_size: i64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			date_format: "%Y-%m-%d".to_string(),
			default_page_size: 20,
			max_page_size: 200,
		}
	}
}

impl EngineConfig {
	pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
		self.date_format = format.into();
		self
	}

	pub fn with_default_page_size(mut self, size: i64) -> Self {
		self.default_page_size = size;
		self
	}

	pub fn with_max_page_size(mut self, size: i64) -> Self {
		self.max_page_size = size;
		self
	}

	/// Clamp a requested page size into the configured window.
	pub fn clamp_page_size(&self, requested: Option<i64>) -> i64 {
		match requested {
			Some(size) if size > 0 => size.min(self.max_page_size),
			_ => self.default_page_size,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamps_oversized_pages() {
		let config = EngineConfig::default().with_max_page_size(100);
		assert_eq!(config.clamp_page_size(Some(500)), 100);
		assert_eq!(config.clamp_page_size(Some(10)), 10);
		assert_eq!(config.clamp_page_size(Some(0)), 20);
		assert_eq!(config.clamp_page_size(None), 20);
	}

	#[test]
	fn deserializes_with_defaults() {
		let config: EngineConfig = serde_json::from_str(r#"{"date_format": "%d.%m.%Y"}"#).unwrap();
		assert_eq!(config.date_format, "%d.%m.%Y");
		assert_eq!(config.default_page_size, 20);
	}
}
