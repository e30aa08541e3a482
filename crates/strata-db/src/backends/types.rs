//! Common type definitions for the backend abstraction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DatabaseError;

/// Backend dialect.
///
/// The dialect decides placeholder style and the SQL shape of payload
/// extraction; everything else in the engine is dialect-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
	Postgres,
	Mysql,
	Sqlite,
}

impl DatabaseType {
	/// Render the n-th (1-based) parameter placeholder.
	///
	/// # Examples
	///
	/// ```
	/// use strata_db::backends::DatabaseType;
	///
	/// assert_eq!(DatabaseType::Postgres.placeholder(3), "$3");
	/// assert_eq!(DatabaseType::Sqlite.placeholder(3), "?");
	/// ```
	pub fn placeholder(&self, index: usize) -> String {
		match self {
			Self::Postgres => format!("${index}"),
			Self::Mysql | Self::Sqlite => "?".to_string(),
		}
	}
}

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
	ReadUncommitted,
	ReadCommitted,
	RepeatableRead,
	Serializable,
}

impl IsolationLevel {
	/// SQL spelling of the isolation level.
	///
	/// # Examples
	///
	/// ```
	/// use strata_db::backends::IsolationLevel;
	///
	/// assert_eq!(IsolationLevel::RepeatableRead.to_sql(), "REPEATABLE READ");
	/// ```
	pub fn to_sql(&self) -> &'static str {
		match self {
			Self::ReadUncommitted => "READ UNCOMMITTED",
			Self::ReadCommitted => "READ COMMITTED",
			Self::RepeatableRead => "REPEATABLE READ",
			Self::Serializable => "SERIALIZABLE",
		}
	}
}

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Timestamp(chrono::DateTime<chrono::Utc>),
	Uuid(Uuid),
}

impl From<&str> for QueryValue {
	fn from(s: &str) -> Self {
		Self::String(s.to_string())
	}
}

impl From<String> for QueryValue {
	fn from(s: String) -> Self {
		Self::String(s)
	}
}

impl From<i64> for QueryValue {
	fn from(i: i64) -> Self {
		Self::Int(i)
	}
}

impl From<f64> for QueryValue {
	fn from(f: f64) -> Self {
		Self::Float(f)
	}
}

impl From<bool> for QueryValue {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<chrono::DateTime<chrono::Utc>> for QueryValue {
	fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
		Self::Timestamp(dt)
	}
}

impl From<Uuid> for QueryValue {
	fn from(u: Uuid) -> Self {
		Self::Uuid(u)
	}
}

/// Result of a statement that does not return rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
	pub rows_affected: u64,
}

/// One flat result row: qualified column alias → value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
	pub data: HashMap<String, QueryValue>,
}

impl Row {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: QueryValue) {
		self.data.insert(key.into(), value);
	}

	/// Typed access to a column that must be present and non-null.
	pub fn get<T: TryFrom<QueryValue, Error = DatabaseError>>(
		&self,
		key: &str,
	) -> std::result::Result<T, DatabaseError> {
		self.data
			.get(key)
			.cloned()
			.ok_or_else(|| DatabaseError::ColumnNotFound(key.to_string()))
			.and_then(TryInto::try_into)
	}

	/// Typed access to a column that may be absent or SQL NULL.
	pub fn get_opt<T: TryFrom<QueryValue, Error = DatabaseError>>(
		&self,
		key: &str,
	) -> std::result::Result<Option<T>, DatabaseError> {
		match self.data.get(key) {
			None | Some(QueryValue::Null) => Ok(None),
			Some(value) => value.clone().try_into().map(Some),
		}
	}
}

impl TryFrom<QueryValue> for i64 {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Int(i) => Ok(i),
			other => Err(DatabaseError::TypeError(format!(
				"cannot convert {other:?} to i64"
			))),
		}
	}
}

impl TryFrom<QueryValue> for f64 {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Float(f) => Ok(f),
			QueryValue::Int(i) => Ok(i as f64),
			other => Err(DatabaseError::TypeError(format!(
				"cannot convert {other:?} to f64"
			))),
		}
	}
}

impl TryFrom<QueryValue> for bool {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Bool(b) => Ok(b),
			QueryValue::Int(i) => Ok(i != 0),
			other => Err(DatabaseError::TypeError(format!(
				"cannot convert {other:?} to bool"
			))),
		}
	}
}

impl TryFrom<QueryValue> for String {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::String(s) => Ok(s),
			other => Err(DatabaseError::TypeError(format!(
				"cannot convert {other:?} to String"
			))),
		}
	}
}

impl TryFrom<QueryValue> for Uuid {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Uuid(u) => Ok(u),
			QueryValue::String(s) => {
				Uuid::parse_str(&s).map_err(|e| DatabaseError::TypeError(e.to_string()))
			}
			other => Err(DatabaseError::TypeError(format!(
				"cannot convert {other:?} to Uuid"
			))),
		}
	}
}

impl TryFrom<QueryValue> for chrono::DateTime<chrono::Utc> {
	type Error = DatabaseError;

	fn try_from(value: QueryValue) -> std::result::Result<Self, Self::Error> {
		match value {
			QueryValue::Timestamp(dt) => Ok(dt),
			QueryValue::String(s) => chrono::DateTime::parse_from_rfc3339(&s)
				.map(|dt| dt.with_timezone(&chrono::Utc))
				.map_err(|e| DatabaseError::TypeError(e.to_string())),
			other => Err(DatabaseError::TypeError(format!(
				"cannot convert {other:?} to DateTime<Utc>"
			))),
		}
	}
}
