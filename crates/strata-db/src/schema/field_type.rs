//! The base-field-type strategy table.
//!
//! Every type-specific SQL decision lives here, as an exhaustive `match`
//! over the closed [`FieldType`] taxonomy: how a logical value is extracted
//! from the payload column per dialect, how it is ordered, how a filter
//! literal converts to a bound parameter, which operators a type admits,
//! and the capability flags the planner consults. No other component
//! special-cases a base type, so adding one is a compile-time-checked,
//! single-point change.
//!
//! Field names interpolated into extraction expressions are schema
//! developer names validated to `[a-z][a-z0-9_]*`; they cannot carry quotes
//! or placeholder marks. Every caller-supplied literal becomes a bound
//! parameter.

use serde::{Deserialize, Serialize};
use strata_core::EngineConfig;

use crate::backends::{DatabaseType, QueryValue};
use crate::filter::FilterOperator;
use crate::query::fragment::SqlFragment;

/// Closed taxonomy of custom field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
	PlainText,
	RichText,
	Number,
	Boolean,
	Date,
	SingleChoice,
	MultiChoice,
	Relation,
}

impl FieldType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::PlainText => "plain_text",
			Self::RichText => "rich_text",
			Self::Number => "number",
			Self::Boolean => "boolean",
			Self::Date => "date",
			Self::SingleChoice => "single_choice",
			Self::MultiChoice => "multi_choice",
			Self::Relation => "relation",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"plain_text" => Some(Self::PlainText),
			"rich_text" => Some(Self::RichText),
			"number" => Some(Self::Number),
			"boolean" => Some(Self::Boolean),
			"date" => Some(Self::Date),
			"single_choice" => Some(Self::SingleChoice),
			"multi_choice" => Some(Self::MultiChoice),
			"relation" => Some(Self::Relation),
			_ => None,
		}
	}

	/// Whether this type carries an enumerated choice set.
	pub fn has_choices(&self) -> bool {
		matches!(self, Self::SingleChoice | Self::MultiChoice)
	}

	/// Whether querying this type requires joining the related record.
	pub fn needs_related_join(&self) -> bool {
		matches!(self, Self::Relation)
	}

	/// Operator admissibility per base type. Violations are validation-time
	/// errors, never SQL.
	pub fn supports(&self, op: FilterOperator) -> bool {
		use FilterOperator::*;
		match self {
			Self::PlainText | Self::RichText => matches!(
				op,
				Eq | Ne
					| Lt | Le | Gt | Ge
					| Contains | NotContains
					| StartsWith | NotStartsWith
					| EndsWith | NotEndsWith
					| IsEmpty | IsNotEmpty
			),
			Self::Number => matches!(op, Eq | Ne | Lt | Le | Gt | Ge | IsEmpty | IsNotEmpty),
			Self::Boolean => matches!(op, Eq | Ne | IsTrue | IsFalse | IsEmpty | IsNotEmpty),
			Self::Date => matches!(op, Eq | Ne | Lt | Le | Gt | Ge | IsEmpty | IsNotEmpty),
			Self::SingleChoice => matches!(op, Eq | Ne | Has | NotHas | IsEmpty | IsNotEmpty),
			// containment only
			Self::MultiChoice => {
				matches!(op, Contains | NotContains | Has | NotHas | IsEmpty | IsNotEmpty)
			}
			Self::Relation => matches!(
				op,
				Eq | Ne
					| Contains | NotContains
					| StartsWith | NotStartsWith
					| EndsWith | NotEndsWith
					| IsEmpty | IsNotEmpty
			),
		}
	}

	/// Value-extraction expression for comparisons.
	///
	/// `payload` is a qualified payload column reference (`c.payload`,
	/// `rel0.payload`); `field` a validated developer name. Date extraction
	/// applies the configured date format — bound as a parameter — so date
	/// comparisons stay format-stable.
	pub fn extract_expr(
		&self,
		dialect: DatabaseType,
		payload: &str,
		field: &str,
		config: &EngineConfig,
	) -> SqlFragment {
		match self {
			Self::PlainText | Self::RichText | Self::SingleChoice | Self::Relation => {
				SqlFragment::raw(text_extract(dialect, payload, field))
			}
			Self::Number => SqlFragment::raw(match dialect {
				DatabaseType::Postgres => format!("({payload} ->> '{field}')::numeric"),
				DatabaseType::Mysql => format!(
					"CAST(JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}')) AS DECIMAL(20,6))"
				),
				DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
			}),
			Self::Boolean => SqlFragment::raw(match dialect {
				DatabaseType::Postgres => format!("({payload} ->> '{field}')::boolean"),
				DatabaseType::Mysql => {
					format!("JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}'))")
				}
				DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
			}),
			Self::MultiChoice => SqlFragment::raw(match dialect {
				DatabaseType::Postgres => format!("{payload} ->> '{field}'"),
				DatabaseType::Mysql => {
					format!("CAST(JSON_EXTRACT({payload}, '$.{field}') AS CHAR)")
				}
				DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
			}),
			Self::Date => {
				let mut fragment = SqlFragment::new();
				match dialect {
					DatabaseType::Postgres => {
						fragment.push(&format!("to_char(({payload} ->> '{field}')::timestamptz, "));
						fragment.push_param(QueryValue::String(strftime_to_postgres(
							&config.date_format,
						)));
						fragment.push(")");
					}
					DatabaseType::Mysql => {
						fragment.push(&format!(
							"DATE_FORMAT(CAST(JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}')) AS DATETIME), "
						));
						fragment.push_param(QueryValue::String(config.date_format.clone()));
						fragment.push(")");
					}
					DatabaseType::Sqlite => {
						fragment.push("strftime(");
						fragment.push_param(QueryValue::String(config.date_format.clone()));
						fragment.push(&format!(", json_extract({payload}, '$.{field}'))"));
					}
				}
				fragment
			}
		}
	}

	/// Expression used for ORDER BY. Dates and numbers order by their
	/// underlying value, not the display format.
	pub fn order_expr(&self, dialect: DatabaseType, payload: &str, field: &str) -> String {
		match self {
			Self::Number => match dialect {
				DatabaseType::Postgres => format!("({payload} ->> '{field}')::numeric"),
				DatabaseType::Mysql => format!(
					"CAST(JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}')) AS DECIMAL(20,6))"
				),
				DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
			},
			Self::Date => match dialect {
				DatabaseType::Postgres => format!("({payload} ->> '{field}')::timestamptz"),
				DatabaseType::Mysql => format!(
					"CAST(JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}')) AS DATETIME)"
				),
				// ISO-8601 text orders chronologically as-is
				DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
			},
			Self::Boolean => match dialect {
				DatabaseType::Postgres => format!("({payload} ->> '{field}')::boolean"),
				DatabaseType::Mysql => {
					format!("JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}'))")
				}
				DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
			},
			_ => text_extract(dialect, payload, field),
		}
	}

	/// Expression used for is-empty / is-not-empty checks: always the plain
	/// text extraction, so a malformed stored value can never make the
	/// check itself fail.
	pub fn presence_expr(&self, dialect: DatabaseType, payload: &str, field: &str) -> String {
		text_extract(dialect, payload, field)
	}

	/// Convert a filter literal into the bound parameter this type compares
	/// against. Returns the human-readable reason on failure; the caller
	/// owns the error context (filter string, field name).
	pub fn literal_param(
		&self,
		dialect: DatabaseType,
		literal: &str,
	) -> std::result::Result<QueryValue, String> {
		match self {
			Self::Number => literal
				.parse::<f64>()
				.map(QueryValue::Float)
				.map_err(|_| format!("'{literal}' is not a number")),
			Self::Boolean => match literal.to_ascii_lowercase().as_str() {
				"true" => Ok(bool_param(dialect, true)),
				"false" => Ok(bool_param(dialect, false)),
				_ => Err(format!("'{literal}' is not a boolean")),
			},
			_ => Ok(QueryValue::String(literal.to_string())),
		}
	}
}

/// Plain text extraction of one payload key.
fn text_extract(dialect: DatabaseType, payload: &str, field: &str) -> String {
	match dialect {
		DatabaseType::Postgres => format!("{payload} ->> '{field}'"),
		DatabaseType::Mysql => format!("JSON_UNQUOTE(JSON_EXTRACT({payload}, '$.{field}'))"),
		DatabaseType::Sqlite => format!("json_extract({payload}, '$.{field}')"),
	}
}

/// Boolean comparison parameter per dialect. PostgreSQL compares a real
/// boolean, SQLite compares the 0/1 integer `json_extract` yields, MySQL
/// compares the unquoted `true`/`false` text.
fn bool_param(dialect: DatabaseType, value: bool) -> QueryValue {
	match dialect {
		DatabaseType::Postgres | DatabaseType::Sqlite => QueryValue::Bool(value),
		DatabaseType::Mysql => QueryValue::String(value.to_string()),
	}
}

/// Translate a strftime-style format into PostgreSQL `to_char` tokens.
/// Unrecognized directives pass through as literal text.
pub(crate) fn strftime_to_postgres(format: &str) -> String {
	let mut out = String::with_capacity(format.len() + 8);
	let mut chars = format.chars();
	while let Some(c) = chars.next() {
		if c != '%' {
			out.push(c);
			continue;
		}
		match chars.next() {
			Some('Y') => out.push_str("YYYY"),
			Some('y') => out.push_str("YY"),
			Some('m') => out.push_str("MM"),
			Some('d') => out.push_str("DD"),
			Some('H') => out.push_str("HH24"),
			Some('I') => out.push_str("HH12"),
			Some('M') => out.push_str("MI"),
			Some('S') => out.push_str("SS"),
			Some('j') => out.push_str("DDD"),
			Some('%') => out.push('%'),
			Some(other) => out.push(other),
			None => {}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn config() -> EngineConfig {
		EngineConfig::default()
	}

	#[test]
	fn text_extraction_shapes_per_dialect() {
		let frag =
			FieldType::PlainText.extract_expr(DatabaseType::Postgres, "c.payload", "title", &config());
		assert_eq!(frag.sql(), "c.payload ->> 'title'");

		let frag =
			FieldType::PlainText.extract_expr(DatabaseType::Sqlite, "c.payload", "title", &config());
		assert_eq!(frag.sql(), "json_extract(c.payload, '$.title')");

		let frag =
			FieldType::PlainText.extract_expr(DatabaseType::Mysql, "c.payload", "title", &config());
		assert_eq!(frag.sql(), "JSON_UNQUOTE(JSON_EXTRACT(c.payload, '$.title'))");
	}

	#[test]
	fn number_extraction_casts_for_numeric_comparison() {
		let frag =
			FieldType::Number.extract_expr(DatabaseType::Postgres, "c.payload", "views", &config());
		assert_eq!(frag.sql(), "(c.payload ->> 'views')::numeric");
	}

	#[test]
	fn date_extraction_binds_the_format_as_a_parameter() {
		let frag =
			FieldType::Date.extract_expr(DatabaseType::Sqlite, "c.payload", "published", &config());
		assert_eq!(frag.sql(), "strftime(?, json_extract(c.payload, '$.published'))");
		assert_eq!(
			frag.params(),
			&[QueryValue::String("%Y-%m-%d".to_string())]
		);

		let frag =
			FieldType::Date.extract_expr(DatabaseType::Postgres, "c.payload", "published", &config());
		assert_eq!(
			frag.params(),
			&[QueryValue::String("YYYY-MM-DD".to_string())]
		);
	}

	#[test]
	fn strftime_translation_covers_common_tokens() {
		assert_eq!(strftime_to_postgres("%Y-%m-%d %H:%M:%S"), "YYYY-MM-DD HH24:MI:SS");
		assert_eq!(strftime_to_postgres("%d.%m.%y"), "DD.MM.YY");
		assert_eq!(strftime_to_postgres("100%%"), "100%");
	}

	#[rstest]
	#[case(FieldType::Number, FilterOperator::Contains)]
	#[case(FieldType::Number, FilterOperator::StartsWith)]
	#[case(FieldType::MultiChoice, FilterOperator::Lt)]
	#[case(FieldType::MultiChoice, FilterOperator::Ge)]
	#[case(FieldType::MultiChoice, FilterOperator::Eq)]
	#[case(FieldType::Boolean, FilterOperator::Contains)]
	#[case(FieldType::Date, FilterOperator::EndsWith)]
	fn inadmissible_operator_combinations(#[case] ty: FieldType, #[case] op: FilterOperator) {
		assert!(!ty.supports(op));
	}

	#[rstest]
	#[case(FieldType::Number, FilterOperator::Le)]
	#[case(FieldType::MultiChoice, FilterOperator::Contains)]
	#[case(FieldType::MultiChoice, FilterOperator::Has)]
	#[case(FieldType::Boolean, FilterOperator::IsTrue)]
	#[case(FieldType::PlainText, FilterOperator::Contains)]
	#[case(FieldType::Relation, FilterOperator::Eq)]
	fn admissible_operator_combinations(#[case] ty: FieldType, #[case] op: FilterOperator) {
		assert!(ty.supports(op));
	}

	#[test]
	fn number_literals_must_parse() {
		assert_eq!(
			FieldType::Number.literal_param(DatabaseType::Sqlite, "42.5"),
			Ok(QueryValue::Float(42.5))
		);
		assert!(FieldType::Number
			.literal_param(DatabaseType::Sqlite, "many")
			.is_err());
	}

	#[test]
	fn boolean_literals_bind_per_dialect() {
		assert_eq!(
			FieldType::Boolean.literal_param(DatabaseType::Postgres, "TRUE"),
			Ok(QueryValue::Bool(true))
		);
		assert_eq!(
			FieldType::Boolean.literal_param(DatabaseType::Mysql, "false"),
			Ok(QueryValue::String("false".to_string()))
		);
		assert!(FieldType::Boolean
			.literal_param(DatabaseType::Sqlite, "yes")
			.is_err());
	}

	#[test]
	fn round_trips_storage_names() {
		for ty in [
			FieldType::PlainText,
			FieldType::RichText,
			FieldType::Number,
			FieldType::Boolean,
			FieldType::Date,
			FieldType::SingleChoice,
			FieldType::MultiChoice,
			FieldType::Relation,
		] {
			assert_eq!(FieldType::parse(ty.as_str()), Some(ty));
		}
	}
}
