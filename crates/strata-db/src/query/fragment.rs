//! SQL fragment writer.
//!
//! A [`SqlFragment`] accumulates statement text and its bound parameters
//! side by side, in emission order. Caller-controlled literals only ever
//! enter through [`SqlFragment::push_param`]; pushed text is limited to
//! static SQL and schema-validated identifiers. Placeholders are written as
//! `?` and renumbered for dialects that need positional markers when the
//! final statement is rendered.
//!
//! Invariant: pushed text never contains a literal `?`. Validated developer
//! names (`[a-z][a-z0-9_]*`) cannot carry one, and no static SQL in the
//! engine does, so every `?` in the buffer is a placeholder.

use crate::backends::{DatabaseType, QueryValue};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
	sql: String,
	params: Vec<QueryValue>,
}

impl SqlFragment {
	pub fn new() -> Self {
		Self::default()
	}

	/// A fragment of plain SQL text with no parameters.
	pub fn raw(sql: impl Into<String>) -> Self {
		Self {
			sql: sql.into(),
			params: Vec::new(),
		}
	}

	/// Append static SQL text.
	pub fn push(&mut self, sql: &str) {
		debug_assert!(
			!sql.contains('?'),
			"static SQL text must not contain placeholder marks"
		);
		self.sql.push_str(sql);
	}

	/// Append a placeholder and bind its value.
	pub fn push_param(&mut self, value: QueryValue) {
		self.sql.push('?');
		self.params.push(value);
	}

	/// Append another fragment, keeping its parameters in order.
	pub fn push_fragment(&mut self, other: Self) {
		self.sql.push_str(&other.sql);
		self.params.extend(other.params);
	}

	pub fn sql(&self) -> &str {
		&self.sql
	}

	pub fn params(&self) -> &[QueryValue] {
		&self.params
	}

	pub fn into_parts(self) -> (String, Vec<QueryValue>) {
		(self.sql, self.params)
	}

	/// Render the final statement for a dialect: PostgreSQL placeholders
	/// are renumbered `$1..$n`, MySQL and SQLite keep `?`.
	pub fn render(&self, dialect: DatabaseType) -> (String, Vec<QueryValue>) {
		let sql = match dialect {
			DatabaseType::Postgres => {
				let mut rendered = String::with_capacity(self.sql.len() + self.params.len() * 2);
				let mut index = 0;
				for c in self.sql.chars() {
					if c == '?' {
						index += 1;
						rendered.push_str(&dialect.placeholder(index));
					} else {
						rendered.push(c);
					}
				}
				rendered
			}
			DatabaseType::Mysql | DatabaseType::Sqlite => self.sql.clone(),
		};
		(sql, self.params.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parameters_stay_in_emission_order() {
		let mut fragment = SqlFragment::raw("a = ");
		fragment.push_param(QueryValue::Int(1));
		fragment.push(" AND b = ");
		fragment.push_param(QueryValue::from("two"));

		let mut outer = SqlFragment::raw("(");
		outer.push_fragment(fragment);
		outer.push(")");

		assert_eq!(outer.sql(), "(a = ? AND b = ?)");
		assert_eq!(
			outer.params(),
			&[QueryValue::Int(1), QueryValue::from("two")]
		);
	}

	#[test]
	fn postgres_rendering_numbers_placeholders() {
		let mut fragment = SqlFragment::raw("x = ");
		fragment.push_param(QueryValue::Int(1));
		fragment.push(" OR y = ");
		fragment.push_param(QueryValue::Int(2));

		let (sql, params) = fragment.render(DatabaseType::Postgres);
		assert_eq!(sql, "x = $1 OR y = $2");
		assert_eq!(params.len(), 2);

		let (sql, _) = fragment.render(DatabaseType::Sqlite);
		assert_eq!(sql, "x = ? OR y = ?");
	}
}
