//! Reserved pseudo-fields.
//!
//! These exist on every record regardless of schema and map to native
//! columns of the record table rather than payload keys. `Primary` is the
//! alias `title`; field resolution rewrites it to the content type's actual
//! primary field, so only the other variants reach SQL generation.

use strata_core::EngineConfig;

use crate::backends::{DatabaseType, QueryValue};
use crate::filter::FilterOperator;
use crate::query::fragment::SqlFragment;

use super::field_type::strftime_to_postgres;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedField {
	Id,
	CreatedAt,
	UpdatedAt,
	CreatedBy,
	ModifiedBy,
	/// The `title` alias for the content type's primary field.
	Primary,
	Template,
}

impl ReservedField {
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"id" => Some(Self::Id),
			"created_at" => Some(Self::CreatedAt),
			"updated_at" => Some(Self::UpdatedAt),
			"created_by" => Some(Self::CreatedBy),
			"modified_by" => Some(Self::ModifiedBy),
			"title" => Some(Self::Primary),
			"template" => Some(Self::Template),
			_ => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Id => "id",
			Self::CreatedAt => "created_at",
			Self::UpdatedAt => "updated_at",
			Self::CreatedBy => "created_by",
			Self::ModifiedBy => "modified_by",
			Self::Primary => "title",
			Self::Template => "template",
		}
	}

	/// Native column on the record table, `None` for the primary alias.
	pub fn column(&self) -> Option<&'static str> {
		match self {
			Self::Id => Some("id"),
			Self::CreatedAt => Some("created_at"),
			Self::UpdatedAt => Some("updated_at"),
			Self::CreatedBy => Some("created_by"),
			Self::ModifiedBy => Some("modified_by"),
			Self::Primary => None,
			Self::Template => Some("template"),
		}
	}

	pub fn supports(&self, op: FilterOperator) -> bool {
		use FilterOperator::*;
		match self {
			Self::Id => matches!(op, Eq | Ne),
			Self::CreatedAt | Self::UpdatedAt => matches!(op, Eq | Ne | Lt | Le | Gt | Ge),
			Self::CreatedBy | Self::ModifiedBy | Self::Template => matches!(
				op,
				Eq | Ne
					| Contains | NotContains
					| StartsWith | NotStartsWith
					| EndsWith | NotEndsWith
					| IsEmpty | IsNotEmpty
			),
			Self::Primary => matches!(
				op,
				Eq | Ne
					| Lt | Le | Gt | Ge
					| Contains | NotContains
					| StartsWith | NotStartsWith
					| EndsWith | NotEndsWith
					| IsEmpty | IsNotEmpty
			),
		}
	}

	/// Comparison-side expression against the base record alias. Timestamp
	/// columns go through the configured date format, same as payload
	/// dates, so the comparison contract is uniform.
	pub fn extract_expr(
		&self,
		dialect: DatabaseType,
		alias: &str,
		config: &EngineConfig,
	) -> SqlFragment {
		match self {
			Self::CreatedAt | Self::UpdatedAt => {
				let column = format!("{alias}.{}", self.name());
				let mut fragment = SqlFragment::new();
				match dialect {
					DatabaseType::Postgres => {
						fragment.push(&format!("to_char({column}, "));
						fragment.push_param(QueryValue::String(strftime_to_postgres(
							&config.date_format,
						)));
						fragment.push(")");
					}
					DatabaseType::Mysql => {
						fragment.push(&format!("DATE_FORMAT({column}, "));
						fragment.push_param(QueryValue::String(config.date_format.clone()));
						fragment.push(")");
					}
					DatabaseType::Sqlite => {
						fragment.push("strftime(");
						fragment.push_param(QueryValue::String(config.date_format.clone()));
						fragment.push(&format!(", {column})"));
					}
				}
				fragment
			}
			Self::Id => SqlFragment::raw(match dialect {
				// compare ids as text so a malformed literal can never
				// abort the statement server-side
				DatabaseType::Postgres => format!("{alias}.id::text"),
				DatabaseType::Mysql | DatabaseType::Sqlite => format!("{alias}.id"),
			}),
			Self::CreatedBy | Self::ModifiedBy | Self::Template => {
				SqlFragment::raw(format!("{alias}.{}", self.name()))
			}
			Self::Primary => SqlFragment::raw(format!("{alias}.id")),
		}
	}

	/// ORDER BY expression: the native column, unformatted.
	pub fn order_expr(&self, alias: &str) -> Option<String> {
		self.column().map(|column| format!("{alias}.{column}"))
	}

	/// Bound parameter for a comparison literal.
	pub fn literal_param(&self, literal: &str) -> std::result::Result<QueryValue, String> {
		match self {
			Self::Id => {
				// normalize so text comparison matches canonical storage
				uuid::Uuid::parse_str(literal)
					.map(|u| QueryValue::String(u.to_string()))
					.map_err(|_| format!("'{literal}' is not a record identifier"))
			}
			_ => Ok(QueryValue::String(literal.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("id", ReservedField::Id)]
	#[case("created_at", ReservedField::CreatedAt)]
	#[case("title", ReservedField::Primary)]
	#[case("template", ReservedField::Template)]
	fn parses_reserved_names(#[case] name: &str, #[case] expected: ReservedField) {
		assert_eq!(ReservedField::parse(name), Some(expected));
	}

	#[test]
	fn unknown_names_are_not_reserved() {
		assert_eq!(ReservedField::parse("views"), None);
	}

	#[test]
	fn id_rejects_ordering_operators() {
		assert!(!ReservedField::Id.supports(FilterOperator::Gt));
		assert!(ReservedField::Id.supports(FilterOperator::Eq));
	}

	#[test]
	fn id_literals_must_be_identifiers() {
		assert!(ReservedField::Id.literal_param("not-a-uuid").is_err());
		let id = uuid::Uuid::new_v4();
		assert_eq!(
			ReservedField::Id.literal_param(&id.to_string()),
			Ok(QueryValue::String(id.to_string()))
		);
	}

	#[test]
	fn timestamps_compare_through_the_date_format() {
		let config = EngineConfig::default();
		let frag =
			ReservedField::CreatedAt.extract_expr(DatabaseType::Postgres, "c", &config);
		assert_eq!(frag.sql(), "to_char(c.created_at, ?)");
		assert_eq!(
			frag.params(),
			&[QueryValue::String("YYYY-MM-DD".to_string())]
		);
	}
}
