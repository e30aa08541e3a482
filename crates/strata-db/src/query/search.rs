//! Free-text search compiler.
//!
//! Expands a search term plus an optional explicit column list into an
//! OR-combined set of per-field predicates, reusing the filter compiler for
//! everything the filter language can express. Typed columns stay exact: a
//! numeric column only matches a numeric term as a number, a boolean column
//! only matches `true`/`false` as a boolean — never as substring text.

use strata_core::{EngineConfig, Result};
use tracing::debug;

use crate::backends::{DatabaseType, QueryValue};
use crate::filter::{FilterNode, FilterOperator};
use crate::schema::{ContentSchema, FieldType, ReservedField, ResolvedField};

use super::compiler::FilterCompiler;
use super::fragment::SqlFragment;

pub struct SearchCompiler<'a> {
	schema: &'a ContentSchema,
	config: &'a EngineConfig,
	dialect: DatabaseType,
}

impl<'a> SearchCompiler<'a> {
	pub fn new(schema: &'a ContentSchema, config: &'a EngineConfig, dialect: DatabaseType) -> Self {
		Self {
			schema,
			config,
			dialect,
		}
	}

	/// Compile the search clause: one parenthesized OR of per-column
	/// predicates, ready to AND into the overall WHERE.
	pub fn compile(&self, term: &str, columns: &[String]) -> Result<SqlFragment> {
		let compiler = FilterCompiler::new(self.schema, self.config, self.dialect, term);

		let mut predicates: Vec<SqlFragment> = Vec::new();

		if columns.is_empty() {
			let primary = self.schema.primary_field()?;
			let node = contains_node(&primary.name, term);
			predicates.push(compiler.compile(&node)?);
		} else {
			for column in columns {
				if let Some(predicate) = self.column_predicate(&compiler, column, term)? {
					predicates.push(predicate);
				}
			}
		}

		// every predicate was dropped as unmatchable for its column type
		if predicates.is_empty() {
			return Ok(SqlFragment::raw("1 = 0"));
		}

		let mut fragment = SqlFragment::raw("(");
		for (index, predicate) in predicates.into_iter().enumerate() {
			if index > 0 {
				fragment.push(" OR ");
			}
			fragment.push_fragment(predicate);
		}
		fragment.push(")");
		Ok(fragment)
	}

	fn column_predicate(
		&self,
		compiler: &FilterCompiler<'_>,
		column: &str,
		term: &str,
	) -> Result<Option<SqlFragment>> {
		// unknown search columns fail loudly, same as filters and sorting
		let resolved = self.schema.resolve(column)?;

		match resolved {
			ResolvedField::Reserved(reserved) => match reserved {
				ReservedField::Id => {
					if uuid::Uuid::parse_str(term).is_ok() {
						let node = FilterNode::condition(
							reserved.name(),
							FilterOperator::Eq,
							Some(term.to_string()),
						);
						Ok(Some(compiler.compile(&node)?))
					} else {
						debug!(column, "search term is not an identifier, skipping column");
						Ok(None)
					}
				}
				// creator/modifier search goes against the joined user's
				// name columns, not the stored username
				ReservedField::CreatedBy => Ok(Some(self.user_name_predicate("cu", term))),
				ReservedField::ModifiedBy => Ok(Some(self.user_name_predicate("mu", term))),
				ReservedField::CreatedAt | ReservedField::UpdatedAt => {
					Ok(Some(self.like_fragment(
						reserved.extract_expr(self.dialect, super::compiler::BASE_ALIAS, self.config),
						term,
					)))
				}
				ReservedField::Template => {
					let node = contains_node(reserved.name(), term);
					Ok(Some(compiler.compile(&node)?))
				}
				// resolution rewrites the alias before we get here
				ReservedField::Primary => Ok(None),
			},
			ResolvedField::Custom(custom) => match custom.field_type {
				FieldType::Number => {
					if term.parse::<f64>().is_ok() {
						let node = FilterNode::condition(
							&custom.name,
							FilterOperator::Eq,
							Some(term.to_string()),
						);
						Ok(Some(compiler.compile(&node)?))
					} else {
						debug!(column, "search term is not numeric, skipping column");
						Ok(None)
					}
				}
				FieldType::Boolean => {
					if matches!(term.to_ascii_lowercase().as_str(), "true" | "false") {
						let node = FilterNode::condition(
							&custom.name,
							FilterOperator::Eq,
							Some(term.to_ascii_lowercase()),
						);
						Ok(Some(compiler.compile(&node)?))
					} else {
						debug!(column, "search term is not a boolean, skipping column");
						Ok(None)
					}
				}
				// the filter language forbids `contains` on dates, but a
				// date column is still searchable by its formatted text
				FieldType::Date => {
					let payload = format!("{}.payload", super::compiler::BASE_ALIAS);
					let extract = custom.field_type.extract_expr(
						self.dialect,
						&payload,
						&custom.name,
						self.config,
					);
					Ok(Some(self.like_fragment(extract, term)))
				}
				_ => {
					let node = contains_node(&custom.name, term);
					Ok(Some(compiler.compile(&node)?))
				}
			},
		}
	}

	/// `(u.given_name LIKE %term% OR u.family_name LIKE %term%)`
	fn user_name_predicate(&self, user_alias: &str, term: &str) -> SqlFragment {
		let mut fragment = SqlFragment::raw(format!("({user_alias}.given_name LIKE "));
		fragment.push_param(like_param(term));
		fragment.push(escape_clause(self.dialect));
		fragment.push(&format!(" OR {user_alias}.family_name LIKE "));
		fragment.push_param(like_param(term));
		fragment.push(escape_clause(self.dialect));
		fragment.push(")");
		fragment
	}

	fn like_fragment(&self, extract: SqlFragment, term: &str) -> SqlFragment {
		let mut fragment = extract;
		fragment.push(" LIKE ");
		fragment.push_param(like_param(term));
		fragment.push(escape_clause(self.dialect));
		fragment
	}
}

fn contains_node(field: &str, term: &str) -> FilterNode {
	FilterNode::condition(field, FilterOperator::Contains, Some(term.to_string()))
}

fn like_param(term: &str) -> QueryValue {
	let mut escaped = String::with_capacity(term.len());
	for c in term.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	QueryValue::String(format!("%{escaped}%"))
}

fn escape_clause(dialect: DatabaseType) -> &'static str {
	match dialect {
		DatabaseType::Mysql => " ESCAPE '\\\\'",
		DatabaseType::Postgres | DatabaseType::Sqlite => " ESCAPE '\\'",
	}
}
