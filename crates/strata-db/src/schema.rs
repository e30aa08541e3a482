//! Runtime schema model.
//!
//! A [`ContentType`] describes a record schema defined by an operator at
//! runtime: an ordered list of typed [`ContentTypeField`]s plus a designated
//! primary field. [`SchemaService`] loads content types from the metadata
//! tables; [`ContentSchema`] is the loaded snapshot every compiler pass
//! resolves field names against.
//!
//! ## Field resolution
//!
//! [`ContentSchema::resolve`] is the single resolution path for field
//! developer names, used by filter validation, search compilation, ordering
//! and payload decoding. Resolution order:
//!
//! 1. reserved pseudo-field names (`id`, `created_at`, `updated_at`,
//!    `created_by`, `modified_by`, `template`) — these cannot be shadowed;
//! 2. the content type's own live fields;
//! 3. `title`, the primary-field alias, when no custom field claims it.

pub mod content_type;
pub mod field;
pub mod field_type;
pub mod reserved;
pub mod service;

pub use content_type::ContentType;
pub use field::{ContentTypeField, FieldChoice};
pub use field_type::FieldType;
pub use reserved::ReservedField;
pub use service::SchemaService;

use strata_core::{Error, Result, normalize_name};

/// A loaded schema snapshot: the content type, its live fields in position
/// order, and — for every relationship field — the related content type
/// with its own fields.
#[derive(Debug, Clone)]
pub struct ContentSchema {
	pub content_type: ContentType,
	pub fields: Vec<ContentTypeField>,
	/// One entry per Relation field, in field position order. The index in
	/// this vector is the relationship's stable join-alias slot.
	pub related: Vec<RelatedSchema>,
}

/// The target side of a one-to-one relationship field.
#[derive(Debug, Clone)]
pub struct RelatedSchema {
	/// Developer name of the Relation field on the owning content type.
	pub field_name: String,
	pub content_type: ContentType,
	pub fields: Vec<ContentTypeField>,
}

impl RelatedSchema {
	/// The related content type's primary field, resolved against its own
	/// field list.
	pub fn primary_field(&self) -> Result<&ContentTypeField> {
		let name = &self.content_type.primary_field;
		self.fields
			.iter()
			.find(|f| &f.name == name)
			.ok_or_else(|| Error::field_not_found(&self.content_type.name, name))
	}
}

/// Result of resolving a field developer name against a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedField<'a> {
	Reserved(ReservedField),
	Custom(&'a ContentTypeField),
}

impl ContentSchema {
	/// Look up a live custom field by developer name.
	pub fn field(&self, name: &str) -> Option<&ContentTypeField> {
		let name = normalize_name(name);
		self.fields.iter().find(|f| f.name == name)
	}

	/// The designated primary field.
	pub fn primary_field(&self) -> Result<&ContentTypeField> {
		let name = &self.content_type.primary_field;
		self.fields
			.iter()
			.find(|f| &f.name == name)
			.ok_or_else(|| Error::field_not_found(&self.content_type.name, name))
	}

	/// Resolve a developer name to a reserved pseudo-field or a custom
	/// field. The primary-field alias resolves to the primary field itself,
	/// so downstream code never special-cases it.
	pub fn resolve(&self, name: &str) -> Result<ResolvedField<'_>> {
		let name = normalize_name(name);

		if let Some(reserved) = ReservedField::parse(&name) {
			if reserved != ReservedField::Primary {
				return Ok(ResolvedField::Reserved(reserved));
			}
			// `title` is only an alias when no custom field claims it.
			if self.field(&name).is_none() {
				return self.primary_field().map(ResolvedField::Custom);
			}
		}

		self.field(&name)
			.map(ResolvedField::Custom)
			.ok_or_else(|| Error::field_not_found(&self.content_type.name, &name))
	}

	/// Relationship slots in field position order: `(alias index, relation
	/// field, related schema)`. The alias index is stable for a given
	/// schema snapshot — slot `n` always joins under alias `rel{n}`.
	pub fn relation_slots(&self) -> Vec<(usize, &ContentTypeField, &RelatedSchema)> {
		self.related
			.iter()
			.enumerate()
			.filter_map(|(index, related)| {
				self.field(&related.field_name)
					.map(|field| (index, field, related))
			})
			.collect()
	}

	/// The slot for one relation field, if the name denotes one.
	pub fn relation_slot(&self, field_name: &str) -> Option<(usize, &RelatedSchema)> {
		let field_name = normalize_name(field_name);
		self.related
			.iter()
			.enumerate()
			.find(|(_, related)| related.field_name == field_name)
			.map(|(index, related)| (index, related))
	}
}
