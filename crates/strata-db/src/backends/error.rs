//! Backend error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),

	#[error("column not found in result row: {0}")]
	ColumnNotFound(String),

	#[error("type error: {0}")]
	TypeError(String),

	#[error("query error: {0}")]
	Query(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

impl From<DatabaseError> for strata_core::Error {
	fn from(err: DatabaseError) -> Self {
		Self::database(err)
	}
}
