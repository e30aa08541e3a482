//! Engine-wide error taxonomy.
//!
//! Every fallible path in the engine surfaces one of these variants. The
//! only tolerated anomaly that does not become an error is an unknown key in
//! a stored payload, which the row mapper logs and drops.

use thiserror::Error;

/// Boxed source for backend failures, so the core crate stays free of any
/// driver dependency.
pub type BoxedDatabaseError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
	/// The referenced content type does not exist or is soft-deleted.
	#[error("content type not found: {0}")]
	ContentTypeNotFound(String),

	/// A field name did not resolve to a reserved pseudo-field or a live
	/// field of the target content type.
	#[error("unknown field '{field}' on content type '{content_type}'")]
	FieldNotFound {
		content_type: String,
		field: String,
	},

	/// Single-record lookup missed.
	#[error("content item not found: {0}")]
	ItemNotFound(String),

	/// The filter string did not parse.
	#[error("malformed filter '{filter}': {reason}")]
	FilterParse { filter: String, reason: String },

	/// The filter parsed but is not valid against the schema: operator not
	/// admissible for the field's base type, or literal not convertible to
	/// the field's comparison type.
	#[error("invalid filter '{filter}' on field '{field}': {reason}")]
	FilterInvalid {
		filter: String,
		field: String,
		reason: String,
	},

	/// A stored payload value did not match the shape its field declares.
	#[error("payload value for field '{field}' is invalid: {reason}")]
	PayloadDecode { field: String, reason: String },

	/// A developer name violated the `[a-z][a-z0-9_]*` contract.
	#[error("invalid developer name '{0}'")]
	InvalidName(String),

	/// The query request itself is unusable (bad order-by syntax, zero page
	/// size and the like).
	#[error("invalid query request: {0}")]
	InvalidRequest(String),

	/// Backend execution failure, propagated unchanged. The engine never
	/// retries and never suppresses partial results.
	#[error("database error: {0}")]
	Database(#[source] BoxedDatabaseError),
}

impl Error {
	/// Wrap a backend failure.
	pub fn database(source: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self::Database(Box::new(source))
	}

	pub fn field_not_found(content_type: impl Into<String>, field: impl Into<String>) -> Self {
		Self::FieldNotFound {
			content_type: content_type.into(),
			field: field.into(),
		}
	}

	pub fn filter_parse(filter: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::FilterParse {
			filter: filter.into(),
			reason: reason.into(),
		}
	}

	pub fn filter_invalid(
		filter: impl Into<String>,
		field: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self::FilterInvalid {
			filter: filter.into(),
			field: field.into(),
			reason: reason.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_names_the_missing_identifier() {
		let err = Error::ContentTypeNotFound("article".to_string());
		assert_eq!(err.to_string(), "content type not found: article");
	}

	#[test]
	fn filter_errors_carry_the_offending_string() {
		let err = Error::filter_parse("views gt", "expected a quoted literal");
		assert!(err.to_string().contains("views gt"));
		assert!(err.to_string().contains("expected a quoted literal"));
	}

	#[test]
	fn database_errors_preserve_the_source() {
		use std::error::Error as _;

		let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
		let err = Error::database(io);
		assert!(err.source().is_some());
	}
}
