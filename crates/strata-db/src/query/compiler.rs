//! Filter-tree SQL compiler.
//!
//! A depth-first visitor over [`FilterNode`] that emits one WHERE-clause
//! fragment. Leaves resolve through the schema: reserved pseudo-fields
//! compile against native columns, custom fields dispatch to the
//! [`FieldType`] strategy, relationship fields target the joined related
//! row's resolved primary field under the slot's stable alias. Every
//! literal is bound as a parameter.

use strata_core::{EngineConfig, Error, Result};

use crate::backends::DatabaseType;
use crate::filter::{FilterNode, FilterOperator, GroupOperator};
use crate::schema::{ContentSchema, ContentTypeField, FieldType, ResolvedField};

use super::fragment::SqlFragment;

/// Alias of the base record table in the planned statement.
pub const BASE_ALIAS: &str = "c";

/// Join alias of relationship slot `index`.
pub fn relation_alias(index: usize) -> String {
	format!("rel{index}")
}

pub struct FilterCompiler<'a> {
	schema: &'a ContentSchema,
	config: &'a EngineConfig,
	dialect: DatabaseType,
	/// The filter string being compiled, for error context.
	filter_text: &'a str,
}

impl<'a> FilterCompiler<'a> {
	pub fn new(
		schema: &'a ContentSchema,
		config: &'a EngineConfig,
		dialect: DatabaseType,
		filter_text: &'a str,
	) -> Self {
		Self {
			schema,
			config,
			dialect,
			filter_text,
		}
	}

	/// Compile a whole expression tree into one WHERE fragment.
	pub fn compile(&self, node: &FilterNode) -> Result<SqlFragment> {
		self.visit(node)
	}

	fn visit(&self, node: &FilterNode) -> Result<SqlFragment> {
		match node {
			FilterNode::Condition {
				field,
				operator,
				value,
			} => self.leaf(field, *operator, value.as_deref()),
			FilterNode::Group { op, children } => self.group(*op, children),
			FilterNode::Not(inner) => {
				let mut fragment = SqlFragment::raw("NOT (");
				fragment.push_fragment(self.visit(inner)?);
				fragment.push(")");
				Ok(fragment)
			}
		}
	}

	fn group(&self, op: GroupOperator, children: &[FilterNode]) -> Result<SqlFragment> {
		let mut fragment = SqlFragment::raw("(");
		for (index, child) in children.iter().enumerate() {
			if index > 0 {
				fragment.push(&format!(" {} ", op.to_sql()));
			}
			fragment.push_fragment(self.visit(child)?);
		}
		fragment.push(")");
		Ok(fragment)
	}

	fn invalid(&self, field: &str, reason: impl Into<String>) -> Error {
		Error::filter_invalid(self.filter_text, field, reason)
	}

	fn leaf(
		&self,
		field: &str,
		operator: FilterOperator,
		value: Option<&str>,
	) -> Result<SqlFragment> {
		let resolved = self
			.schema
			.resolve(field)
			.map_err(|_| self.invalid(field, "unknown field"))?;

		match resolved {
			ResolvedField::Reserved(reserved) => {
				if !reserved.supports(operator) {
					return Err(self.invalid(
						field,
						format!(
							"operator '{}' is not supported for this field",
							operator.keyword()
						),
					));
				}
				let extract = reserved.extract_expr(self.dialect, BASE_ALIAS, self.config);
				let param = match value {
					Some(literal) => Some(
						reserved
							.literal_param(literal)
							.map_err(|reason| self.invalid(field, reason))?,
					),
					None => None,
				};
				self.shape(field, operator, extract, param, &format!("{BASE_ALIAS}.{}", reserved.name()))
			}
			ResolvedField::Custom(custom) => {
				if !custom.field_type.supports(operator) {
					return Err(self.invalid(
						field,
						format!(
							"operator '{}' is not supported for {} fields",
							operator.keyword(),
							custom.field_type.as_str()
						),
					));
				}
				self.check_choices(custom, operator, value)?;

				if custom.field_type == FieldType::Relation {
					self.relation_leaf(custom, operator, value)
				} else {
					let payload = format!("{BASE_ALIAS}.payload");
					let extract = custom.field_type.extract_expr(
						self.dialect,
						&payload,
						&custom.name,
						self.config,
					);
					let param = self.literal_for(custom, value)?;
					let presence = custom
						.field_type
						.presence_expr(self.dialect, &payload, &custom.name);
					self.shape(&custom.name, operator, extract, param, &presence)
				}
			}
		}
	}

	/// A leaf targeting a relationship field: the extraction reads the
	/// *joined* related row's resolved primary field, never the raw foreign
	/// key. Presence checks are the exception — they look at the stored
	/// key on the base row, so a dangling reference still counts as set.
	fn relation_leaf(
		&self,
		custom: &ContentTypeField,
		operator: FilterOperator,
		value: Option<&str>,
	) -> Result<SqlFragment> {
		let base_payload = format!("{BASE_ALIAS}.payload");
		if matches!(operator, FilterOperator::IsEmpty | FilterOperator::IsNotEmpty) {
			let presence = custom
				.field_type
				.presence_expr(self.dialect, &base_payload, &custom.name);
			return self.shape(&custom.name, operator, SqlFragment::new(), None, &presence);
		}

		let (slot, related) = self
			.schema
			.relation_slot(&custom.name)
			.ok_or_else(|| self.invalid(&custom.name, "relationship target is not available"))?;
		let primary = related.primary_field()?;

		let payload = format!("{}.payload", relation_alias(slot));
		let extract =
			primary
				.field_type
				.extract_expr(self.dialect, &payload, &primary.name, self.config);
		let param = match value {
			Some(literal) => Some(
				primary
					.field_type
					.literal_param(self.dialect, literal)
					.map_err(|reason| self.invalid(&custom.name, reason))?,
			),
			None => None,
		};
		let presence = primary
			.field_type
			.presence_expr(self.dialect, &payload, &primary.name);
		self.shape(&custom.name, operator, extract, param, &presence)
	}

	/// Choice-bearing fields only compare against their declared choices.
	fn check_choices(
		&self,
		custom: &ContentTypeField,
		operator: FilterOperator,
		value: Option<&str>,
	) -> Result<()> {
		if !custom.field_type.has_choices() || !operator.takes_literal() {
			return Ok(());
		}
		match value {
			Some(literal) if custom.has_choice(literal) => Ok(()),
			Some(literal) => Err(self.invalid(
				&custom.name,
				format!("'{literal}' is not one of the field's choices"),
			)),
			None => Ok(()),
		}
	}

	fn literal_for(
		&self,
		custom: &ContentTypeField,
		value: Option<&str>,
	) -> Result<Option<crate::backends::QueryValue>> {
		match value {
			Some(literal) => custom
				.field_type
				.literal_param(self.dialect, literal)
				.map(Some)
				.map_err(|reason| self.invalid(&custom.name, reason)),
			None => Ok(None),
		}
	}

	/// Combine the extraction expression with the operator-specific
	/// comparison shape.
	fn shape(
		&self,
		field: &str,
		operator: FilterOperator,
		extract: SqlFragment,
		param: Option<crate::backends::QueryValue>,
		presence: &str,
	) -> Result<SqlFragment> {
		use FilterOperator::*;

		let comparison = |symbol: &str| -> Result<SqlFragment> {
			let param = param
				.clone()
				.ok_or_else(|| self.invalid(field, "operator requires a literal"))?;
			let mut fragment = extract.clone();
			fragment.push(&format!(" {symbol} "));
			fragment.push_param(param);
			Ok(fragment)
		};

		let like = |template: fn(&str) -> String, negated: bool| -> Result<SqlFragment> {
			let param = param
				.clone()
				.ok_or_else(|| self.invalid(field, "operator requires a literal"))?;
			let text = match param {
				crate::backends::QueryValue::String(s) => s,
				other => {
					return Err(self.invalid(
						field,
						format!("cannot pattern-match against {other:?}"),
					));
				}
			};
			let mut fragment = extract.clone();
			fragment.push(if negated { " NOT LIKE " } else { " LIKE " });
			fragment.push_param(crate::backends::QueryValue::String(template(&escape_like(
				&text,
			))));
			fragment.push(escape_clause(self.dialect));
			Ok(fragment)
		};

		match operator {
			Eq => comparison("="),
			Ne => comparison("<>"),
			Lt => comparison("<"),
			Le => comparison("<="),
			Gt => comparison(">"),
			Ge => comparison(">="),
			Contains => like(|v| format!("%{v}%"), false),
			NotContains => like(|v| format!("%{v}%"), true),
			StartsWith => like(|v| format!("{v}%"), false),
			NotStartsWith => like(|v| format!("{v}%"), true),
			EndsWith => like(|v| format!("%{v}"), false),
			NotEndsWith => like(|v| format!("%{v}"), true),
			// choice membership: serialized arrays store `"name"`, so the
			// quoted form matches exactly one element
			Has => like(|v| format!("%\"{v}\"%"), false),
			NotHas => like(|v| format!("%\"{v}\"%"), true),
			IsTrue | IsFalse => {
				let literal = if operator == IsTrue { "true" } else { "false" };
				let param = FieldType::Boolean
					.literal_param(self.dialect, literal)
					.map_err(|reason| self.invalid(field, reason))?;
				let mut fragment = extract.clone();
				fragment.push(" = ");
				fragment.push_param(param);
				Ok(fragment)
			}
			IsEmpty => Ok(SqlFragment::raw(format!(
				"({presence} IS NULL OR {presence} = '')"
			))),
			IsNotEmpty => Ok(SqlFragment::raw(format!(
				"({presence} IS NOT NULL AND {presence} <> '')"
			))),
		}
	}
}

/// Escape LIKE metacharacters so user text matches literally.
fn escape_like(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	for c in value.chars() {
		if matches!(c, '\\' | '%' | '_') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

/// The ESCAPE clause spelling per dialect (MySQL string syntax doubles the
/// backslash).
fn escape_clause(dialect: DatabaseType) -> &'static str {
	match dialect {
		DatabaseType::Mysql => " ESCAPE '\\\\'",
		DatabaseType::Postgres | DatabaseType::Sqlite => " ESCAPE '\\'",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::QueryValue;
	use crate::filter::parse_filter;
	use crate::schema::{ContentType, ContentTypeField, RelatedSchema};
	use uuid::Uuid;

	fn schema() -> ContentSchema {
		let type_id = Uuid::new_v4();
		let related_id = Uuid::new_v4();
		let fields = vec![
			ContentTypeField::new(type_id, "title", FieldType::PlainText, 0),
			ContentTypeField::new(type_id, "views", FieldType::Number, 1),
			ContentTypeField::new(type_id, "featured", FieldType::Boolean, 2),
			ContentTypeField::new(type_id, "published", FieldType::Date, 3),
			ContentTypeField::new(type_id, "tags", FieldType::MultiChoice, 4)
				.with_choices(&["rust", "sql", "web"]),
			ContentTypeField::new(type_id, "author", FieldType::Relation, 5)
				.with_related_type(related_id),
		];
		let related = RelatedSchema {
			field_name: "author".into(),
			content_type: ContentType {
				id: related_id,
				name: "person".into(),
				label: "Person".into(),
				primary_field: "name".into(),
				deleted_at: None,
			},
			fields: vec![ContentTypeField::new(related_id, "name", FieldType::PlainText, 0)],
		};
		ContentSchema {
			content_type: ContentType {
				id: type_id,
				name: "post".into(),
				label: "Post".into(),
				primary_field: "title".into(),
				deleted_at: None,
			},
			fields,
			related: vec![related],
		}
	}

	fn compile(filter: &str) -> Result<SqlFragment> {
		let schema = schema();
		let config = EngineConfig::default();
		let compiler = FilterCompiler::new(&schema, &config, DatabaseType::Sqlite, filter);
		let node = parse_filter(filter)?;
		compiler.compile(&node)
	}

	#[test]
	fn compiles_a_numeric_comparison() {
		let fragment = compile("views gt '100'").unwrap();
		assert_eq!(fragment.sql(), "json_extract(c.payload, '$.views') > ?");
		assert_eq!(fragment.params(), &[QueryValue::Float(100.0)]);
	}

	#[test]
	fn literals_with_sql_metacharacters_stay_parameters() {
		let fragment = compile("title eq '''; DROP TABLE content_item;--'").unwrap();
		// the statement shape is unchanged; the hostile text is a bound value
		assert_eq!(fragment.sql(), "json_extract(c.payload, '$.title') = ?");
		assert_eq!(
			fragment.params(),
			&[QueryValue::String("'; DROP TABLE content_item;--".to_string())]
		);
	}

	#[test]
	fn group_parenthesization_follows_the_tree() {
		let left = compile("(views gt '1' and featured istrue) or views lt '0'").unwrap();
		let right = compile("views gt '1' and (featured istrue or views lt '0')").unwrap();
		assert_ne!(left.sql(), right.sql());
		assert!(left.sql().starts_with("(("));
		assert!(right.sql().ends_with("))"));
	}

	#[test]
	fn compilation_is_deterministic() {
		let a = compile("contains(title, 'x') and views ge '2'").unwrap();
		let b = compile("contains(title, 'x') and views ge '2'").unwrap();
		assert_eq!(a.sql(), b.sql());
		assert_eq!(a.params(), b.params());
	}

	#[test]
	fn contains_on_a_number_field_is_rejected() {
		let err = compile("contains(views, '10')").unwrap_err();
		match err {
			Error::FilterInvalid { field, reason, .. } => {
				assert_eq!(field, "views");
				assert!(reason.contains("not supported for number"));
			}
			other => panic!("expected FilterInvalid, got {other:?}"),
		}
	}

	#[test]
	fn ordering_on_a_multi_choice_field_is_rejected() {
		let err = compile("tags ge 'rust'").unwrap_err();
		assert!(matches!(err, Error::FilterInvalid { .. }));
	}

	#[test]
	fn multi_choice_containment_matches_the_quoted_element() {
		let fragment = compile("has(tags, 'rust')").unwrap();
		assert_eq!(
			fragment.sql(),
			"json_extract(c.payload, '$.tags') LIKE ? ESCAPE '\\'"
		);
		assert_eq!(
			fragment.params(),
			&[QueryValue::String("%\"rust\"%".to_string())]
		);
	}

	#[test]
	fn choice_literals_outside_the_set_are_rejected() {
		let err = compile("has(tags, 'golf')").unwrap_err();
		match err {
			Error::FilterInvalid { reason, .. } => assert!(reason.contains("choices")),
			other => panic!("expected FilterInvalid, got {other:?}"),
		}
	}

	#[test]
	fn unparseable_literals_are_rejected_with_the_field() {
		let err = compile("views eq 'many'").unwrap_err();
		match err {
			Error::FilterInvalid { field, filter, .. } => {
				assert_eq!(field, "views");
				assert_eq!(filter, "views eq 'many'");
			}
			other => panic!("expected FilterInvalid, got {other:?}"),
		}
	}

	#[test]
	fn unknown_fields_carry_the_filter_string() {
		let err = compile("ghost eq 'x'").unwrap_err();
		match err {
			Error::FilterInvalid { filter, field, .. } => {
				assert_eq!(filter, "ghost eq 'x'");
				assert_eq!(field, "ghost");
			}
			other => panic!("expected FilterInvalid, got {other:?}"),
		}
	}

	#[test]
	fn relation_leaves_target_the_joined_primary_field() {
		let fragment = compile("author eq 'Ada'").unwrap();
		assert_eq!(fragment.sql(), "json_extract(rel0.payload, '$.name') = ?");
		assert_eq!(fragment.params(), &[QueryValue::String("Ada".to_string())]);
	}

	#[test]
	fn relation_presence_checks_the_stored_key() {
		let fragment = compile("author isnotempty").unwrap();
		assert!(fragment.sql().contains("json_extract(c.payload, '$.author')"));
		assert!(!fragment.sql().contains("rel0"));
	}

	#[test]
	fn boolean_presence_terms_bind_a_parameter() {
		let fragment = compile("featured istrue").unwrap();
		assert_eq!(fragment.sql(), "json_extract(c.payload, '$.featured') = ?");
		assert_eq!(fragment.params(), &[QueryValue::Bool(true)]);
	}

	#[test]
	fn like_patterns_escape_wildcards_in_user_text() {
		let fragment = compile("contains(title, '50%_off')").unwrap();
		assert_eq!(
			fragment.params(),
			&[QueryValue::String("%50\\%\\_off%".to_string())]
		);
	}

	#[test]
	fn not_wraps_the_compiled_expression() {
		let fragment = compile("not featured istrue").unwrap();
		assert_eq!(
			fragment.sql(),
			"NOT (json_extract(c.payload, '$.featured') = ?)"
		);
	}

	#[test]
	fn reserved_id_compares_normalized_text() {
		let id = Uuid::new_v4();
		let filter = format!("id eq '{id}'");
		let schema = schema();
		let config = EngineConfig::default();
		let compiler = FilterCompiler::new(&schema, &config, DatabaseType::Postgres, &filter);
		let node = parse_filter(&filter).unwrap();
		let fragment = compiler.compile(&node).unwrap();
		assert_eq!(fragment.sql(), "c.id::text = ?");
		assert_eq!(
			fragment.params(),
			&[QueryValue::String(id.to_string())]
		);
	}
}
