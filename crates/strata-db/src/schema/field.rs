//! Content type field metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field_type::FieldType;

/// One typed, named slot in a content type's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeField {
	pub id: Uuid,
	pub content_type_id: Uuid,
	/// Developer name, unique within the content type, case-normalized.
	pub name: String,
	pub label: String,
	pub field_type: FieldType,
	pub position: i32,
	pub required: bool,
	/// Choice set for choice-bearing types; each choice has a unique,
	/// non-empty developer name.
	pub choices: Vec<FieldChoice>,
	/// Target content type for `Relation` fields.
	pub related_type: Option<Uuid>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl ContentTypeField {
	/// Bare field for tests and in-memory schema construction.
	pub fn new(
		content_type_id: Uuid,
		name: impl Into<String>,
		field_type: FieldType,
		position: i32,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			content_type_id,
			name: name.into(),
			label: String::new(),
			field_type,
			position,
			required: false,
			choices: Vec::new(),
			related_type: None,
			deleted_at: None,
		}
	}

	pub fn with_choices(mut self, names: &[&str]) -> Self {
		self.choices = names
			.iter()
			.enumerate()
			.map(|(index, name)| FieldChoice {
				id: Uuid::new_v4(),
				name: (*name).to_string(),
				label: String::new(),
				position: index as i32,
			})
			.collect();
		self
	}

	pub fn with_related_type(mut self, related: Uuid) -> Self {
		self.related_type = Some(related);
		self
	}

	/// Whether `value` names one of this field's choices.
	pub fn has_choice(&self, value: &str) -> bool {
		self.choices.iter().any(|choice| choice.name == value)
	}
}

/// One entry of a choice set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChoice {
	pub id: Uuid,
	pub name: String,
	pub label: String,
	pub position: i32,
}
