//! Row mapper.
//!
//! Reconstitutes one flat result row (qualified `{alias}__{column}` keys)
//! into a structured [`ContentItem`] graph: native fields, the payload
//! decoded against the schema, audit users, route, and — per relationship
//! slot — the nested related record. A relationship whose LEFT JOIN missed
//! (NULL related id) is omitted, never an error.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use strata_core::{Error, Result};
use tracing::warn;
use uuid::Uuid;

use crate::backends::Row;
use crate::records::{ContentItem, FieldValue, Route, UserRef};
use crate::schema::{ContentSchema, ContentTypeField, FieldType};

use super::compiler::{BASE_ALIAS, relation_alias};

pub struct RowMapper<'a> {
	schema: &'a ContentSchema,
}

impl<'a> RowMapper<'a> {
	pub fn new(schema: &'a ContentSchema) -> Self {
		Self { schema }
	}

	/// Map one result row into a record graph.
	pub fn map_row(&self, row: &Row) -> Result<ContentItem> {
		let mut item = self
			.map_item(row, BASE_ALIAS, &self.schema.fields)?
			.ok_or_else(|| {
				Error::ItemNotFound(format!(
					"result row carries no base record for content type '{}'",
					self.schema.content_type.name
				))
			})?;

		for (slot, field, related) in self.schema.relation_slots() {
			let alias = relation_alias(slot);
			if let Some(related_item) = self.map_item(row, &alias, &related.fields)? {
				item.related.insert(field.name.clone(), related_item);
			}
		}

		Ok(item)
	}

	/// Map the triad under one table alias. Returns `None` when the alias's
	/// id column is NULL — a left-join miss.
	fn map_item(
		&self,
		row: &Row,
		alias: &str,
		fields: &[ContentTypeField],
	) -> Result<Option<ContentItem>> {
		let Some(id) = row
			.get_opt::<Uuid>(&format!("{alias}__id"))
			.map_err(Error::database)?
		else {
			return Ok(None);
		};

		let content_type_id: Uuid = row
			.get(&format!("{alias}__content_type_id"))
			.map_err(Error::database)?;
		let created_at: DateTime<Utc> = row
			.get(&format!("{alias}__created_at"))
			.map_err(Error::database)?;
		let updated_at: DateTime<Utc> = row
			.get(&format!("{alias}__updated_at"))
			.map_err(Error::database)?;
		let template = row
			.get_opt::<String>(&format!("{alias}__template"))
			.map_err(Error::database)?;

		let payload = match row
			.get_opt::<String>(&format!("{alias}__payload"))
			.map_err(Error::database)?
		{
			Some(raw) => decode_payload(fields, &raw)?,
			None => IndexMap::new(),
		};

		Ok(Some(ContentItem {
			id,
			content_type_id,
			payload,
			template,
			route: self.map_route(row, &join_alias(alias, "r"))?,
			created_at,
			updated_at,
			created_by: self.map_user(row, &join_alias(alias, "cu"))?,
			modified_by: self.map_user(row, &join_alias(alias, "mu"))?,
			related: IndexMap::new(),
		}))
	}

	fn map_user(&self, row: &Row, alias: &str) -> Result<Option<UserRef>> {
		let Some(id) = row
			.get_opt::<Uuid>(&format!("{alias}__id"))
			.map_err(Error::database)?
		else {
			return Ok(None);
		};
		Ok(Some(UserRef {
			id,
			username: row
				.get_opt(&format!("{alias}__username"))
				.map_err(Error::database)?
				.unwrap_or_default(),
			given_name: row
				.get_opt(&format!("{alias}__given_name"))
				.map_err(Error::database)?
				.unwrap_or_default(),
			family_name: row
				.get_opt(&format!("{alias}__family_name"))
				.map_err(Error::database)?
				.unwrap_or_default(),
		}))
	}

	fn map_route(&self, row: &Row, alias: &str) -> Result<Option<Route>> {
		let Some(id) = row
			.get_opt::<Uuid>(&format!("{alias}__id"))
			.map_err(Error::database)?
		else {
			return Ok(None);
		};
		Ok(Some(Route {
			id,
			path: row
				.get_opt(&format!("{alias}__path"))
				.map_err(Error::database)?
				.unwrap_or_default(),
		}))
	}
}

/// The companion-join alias for a table alias: base `c` joins `cu`, `mu`
/// and `r`; relationship `rel0` joins `rel0cu`, `rel0mu` and `rel0r`.
fn join_alias(item_alias: &str, suffix: &str) -> String {
	if item_alias == BASE_ALIAS {
		suffix.to_string()
	} else {
		format!("{item_alias}{suffix}")
	}
}

/// Decode a stored payload document against the schema's field list into a
/// typed map. Unknown keys are logged and dropped — never passed through
/// silently; wrong-shaped values are decode errors.
pub fn decode_payload(
	fields: &[ContentTypeField],
	raw: &str,
) -> Result<IndexMap<String, FieldValue>> {
	let document: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
		Error::PayloadDecode {
			field: String::new(),
			reason: format!("payload is not a JSON document: {e}"),
		}
	})?;
	let serde_json::Value::Object(entries) = document else {
		return Err(Error::PayloadDecode {
			field: String::new(),
			reason: "payload root is not an object".to_string(),
		});
	};

	let mut decoded = IndexMap::with_capacity(entries.len());
	for (key, value) in entries {
		let Some(field) = fields.iter().find(|f| f.name == key) else {
			warn!(key, "payload carries a key with no schema field, dropping");
			continue;
		};
		if value.is_null() {
			continue;
		}
		decoded.insert(key, decode_value(field, value)?);
	}
	Ok(decoded)
}

fn decode_value(field: &ContentTypeField, value: serde_json::Value) -> Result<FieldValue> {
	let mismatch = |expected: &str, got: &serde_json::Value| Error::PayloadDecode {
		field: field.name.clone(),
		reason: format!("expected {expected}, got {got}"),
	};

	match field.field_type {
		FieldType::PlainText => match value {
			serde_json::Value::String(s) => Ok(FieldValue::Text(s)),
			other => Err(mismatch("a string", &other)),
		},
		FieldType::RichText => match value {
			serde_json::Value::String(s) => Ok(FieldValue::Rich(s)),
			other => Err(mismatch("a string", &other)),
		},
		FieldType::Number => value
			.as_f64()
			.map(FieldValue::Number)
			.ok_or_else(|| mismatch("a number", &value)),
		FieldType::Boolean => match value {
			serde_json::Value::Bool(b) => Ok(FieldValue::Boolean(b)),
			other => Err(mismatch("a boolean", &other)),
		},
		FieldType::Date => match value {
			serde_json::Value::String(s) => parse_date(&s).ok_or_else(|| Error::PayloadDecode {
				field: field.name.clone(),
				reason: format!("'{s}' is not a date"),
			}),
			other => Err(mismatch("a date string", &other)),
		},
		FieldType::SingleChoice => match value {
			serde_json::Value::String(s) => Ok(FieldValue::Choice(s)),
			other => Err(mismatch("a choice name", &other)),
		},
		FieldType::MultiChoice => match value {
			serde_json::Value::Array(entries) => {
				let mut choices = Vec::with_capacity(entries.len());
				for entry in entries {
					match entry {
						serde_json::Value::String(s) => choices.push(s),
						other => return Err(mismatch("an array of choice names", &other)),
					}
				}
				Ok(FieldValue::MultiChoice(choices))
			}
			other => Err(mismatch("an array of choice names", &other)),
		},
		FieldType::Relation => match value {
			serde_json::Value::String(s) => Uuid::parse_str(&s)
				.map(FieldValue::Reference)
				.map_err(|_| Error::PayloadDecode {
					field: field.name.clone(),
					reason: format!("'{s}' is not a record identifier"),
				}),
			other => Err(mismatch("a record identifier", &other)),
		},
	}
}

/// Stored dates are RFC 3339; a bare `YYYY-MM-DD` is accepted as midnight
/// UTC.
fn parse_date(value: &str) -> Option<FieldValue> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
		return Some(FieldValue::Date(dt.with_timezone(&Utc)));
	}
	chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|naive| FieldValue::Date(naive.and_utc()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::QueryValue;
	use crate::schema::{ContentType, RelatedSchema};

	fn schema() -> ContentSchema {
		let type_id = Uuid::new_v4();
		let related_id = Uuid::new_v4();
		ContentSchema {
			content_type: ContentType {
				id: type_id,
				name: "post".into(),
				label: "Post".into(),
				primary_field: "title".into(),
				deleted_at: None,
			},
			fields: vec![
				ContentTypeField::new(type_id, "title", FieldType::PlainText, 0),
				ContentTypeField::new(type_id, "views", FieldType::Number, 1),
				ContentTypeField::new(type_id, "author", FieldType::Relation, 2)
					.with_related_type(related_id),
			],
			related: vec![RelatedSchema {
				field_name: "author".into(),
				content_type: ContentType {
					id: related_id,
					name: "person".into(),
					label: "Person".into(),
					primary_field: "name".into(),
					deleted_at: None,
				},
				fields: vec![ContentTypeField::new(
					related_id,
					"name",
					FieldType::PlainText,
					0,
				)],
			}],
		}
	}

	fn item_columns(row: &mut Row, alias: &str, type_id: Uuid, payload: &str) -> Uuid {
		let id = Uuid::new_v4();
		row.insert(format!("{alias}__id"), QueryValue::Uuid(id));
		row.insert(
			format!("{alias}__content_type_id"),
			QueryValue::Uuid(type_id),
		);
		row.insert(format!("{alias}__payload"), QueryValue::from(payload));
		row.insert(format!("{alias}__template"), QueryValue::Null);
		row.insert(
			format!("{alias}__created_at"),
			QueryValue::from("2026-01-10T08:00:00Z"),
		);
		row.insert(
			format!("{alias}__updated_at"),
			QueryValue::from("2026-01-11T08:00:00Z"),
		);
		row.insert(format!("{alias}__created_by"), QueryValue::from("ada"));
		row.insert(format!("{alias}__modified_by"), QueryValue::Null);
		id
	}

	#[test]
	fn maps_a_row_with_a_present_relationship() {
		let schema = schema();
		let mut row = Row::new();
		let base_id = item_columns(
			&mut row,
			"c",
			schema.content_type.id,
			r#"{"title": "Strata", "views": 7}"#,
		);
		item_columns(
			&mut row,
			"rel0",
			schema.related[0].content_type.id,
			r#"{"name": "Ada"}"#,
		);
		let user_id = Uuid::new_v4();
		row.insert("cu__id", QueryValue::Uuid(user_id));
		row.insert("cu__username", QueryValue::from("ada"));
		row.insert("cu__given_name", QueryValue::from("Ada"));
		row.insert("cu__family_name", QueryValue::from("Lovelace"));
		let route_id = Uuid::new_v4();
		row.insert("r__id", QueryValue::Uuid(route_id));
		row.insert("r__path", QueryValue::from("/strata"));

		let item = RowMapper::new(&schema).map_row(&row).unwrap();
		assert_eq!(item.id, base_id);
		assert_eq!(
			item.field("title"),
			Some(&FieldValue::Text("Strata".into()))
		);
		assert_eq!(item.field("views"), Some(&FieldValue::Number(7.0)));
		assert_eq!(item.created_by.as_ref().map(|u| u.given_name.as_str()), Some("Ada"));
		assert_eq!(item.route.as_ref().map(|r| r.path.as_str()), Some("/strata"));

		let author = item.related_item("author").expect("related row present");
		assert_eq!(author.field("name"), Some(&FieldValue::Text("Ada".into())));
	}

	#[test]
	fn a_left_join_miss_omits_the_relationship() {
		let schema = schema();
		let mut row = Row::new();
		item_columns(
			&mut row,
			"c",
			schema.content_type.id,
			r#"{"title": "Orphan", "author": "00000000-0000-0000-0000-000000000001"}"#,
		);
		// rel0 columns all NULL — the related record was deleted
		row.insert("rel0__id", QueryValue::Null);

		let item = RowMapper::new(&schema).map_row(&row).unwrap();
		assert!(item.related_item("author").is_none());
		// the dangling reference itself still decodes
		assert!(matches!(
			item.field("author"),
			Some(FieldValue::Reference(_))
		));
	}

	#[test]
	fn unknown_payload_keys_are_dropped() {
		let fields = schema().fields;
		let decoded =
			decode_payload(&fields, r#"{"title": "x", "legacy_field": "y"}"#).unwrap();
		assert!(decoded.contains_key("title"));
		assert!(!decoded.contains_key("legacy_field"));
	}

	#[test]
	fn wrong_shaped_values_are_decode_errors() {
		let fields = schema().fields;
		let err = decode_payload(&fields, r#"{"views": "seven"}"#).unwrap_err();
		match err {
			Error::PayloadDecode { field, .. } => assert_eq!(field, "views"),
			other => panic!("expected PayloadDecode, got {other:?}"),
		}
	}

	#[test]
	fn date_only_strings_decode_as_midnight_utc() {
		assert!(matches!(
			parse_date("2026-03-01"),
			Some(FieldValue::Date(_))
		));
		assert!(parse_date("not a date").is_none());
	}
}
