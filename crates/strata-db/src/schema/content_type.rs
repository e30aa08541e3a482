//! Content type metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A runtime-defined record schema.
///
/// The developer `name` is unique within the tenant and treated as
/// immutable; `primary_field` names a plain-text field of this type whose
/// value stands in for the record in listings and relationship displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
	pub id: Uuid,
	pub name: String,
	pub label: String,
	pub primary_field: String,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl ContentType {
	pub fn is_deleted(&self) -> bool {
		self.deleted_at.is_some()
	}
}
