//! SQLite driver.
//!
//! Values with no native SQLite representation are stored as TEXT: UUIDs in
//! canonical hyphenated form, timestamps as RFC 3339. The JSON payload
//! column is TEXT queried through the built-in `json_extract`.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use super::backend::{DatabaseBackend, TransactionExecutor};
use super::error::Result;
use super::types::{DatabaseType, IsolationLevel, QueryResult, QueryValue, Row};

#[derive(Debug, Clone)]
pub struct SqliteBackend {
	pool: SqlitePool,
}

impl SqliteBackend {
	/// Connect to a SQLite database URL, e.g. `sqlite::memory:`.
	pub async fn connect(url: &str) -> Result<Self> {
		let pool = SqlitePoolOptions::new()
			.max_connections(5)
			.connect(url)
			.await?;
		Ok(Self { pool })
	}

	pub fn from_pool(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_param<'q>(query: SqliteQuery<'q>, param: &QueryValue) -> SqliteQuery<'q> {
	match param {
		QueryValue::Null => query.bind(Option::<String>::None),
		QueryValue::Bool(b) => query.bind(*b),
		QueryValue::Int(i) => query.bind(*i),
		QueryValue::Float(f) => query.bind(*f),
		QueryValue::String(s) => query.bind(s.clone()),
		QueryValue::Timestamp(dt) => query.bind(dt.to_rfc3339()),
		QueryValue::Uuid(u) => query.bind(u.to_string()),
	}
}

fn bind_all<'q>(sql: &'q str, params: &[QueryValue]) -> SqliteQuery<'q> {
	let mut query = sqlx::query(sql);
	for param in params {
		query = bind_param(query, param);
	}
	query
}

fn convert_row(row: &SqliteRow) -> Row {
	let mut out = Row::new();
	for (index, column) in row.columns().iter().enumerate() {
		let is_null = row
			.try_get_raw(index)
			.map(|value| value.is_null())
			.unwrap_or(true);

		let value = if is_null {
			QueryValue::Null
		} else {
			// SQLite reports the runtime type of the value, not a declared
			// column type, so expression columns decode correctly too.
			match column.type_info().name() {
				"INTEGER" => row
					.try_get::<i64, _>(index)
					.map(QueryValue::Int)
					.unwrap_or(QueryValue::Null),
				"REAL" => row
					.try_get::<f64, _>(index)
					.map(QueryValue::Float)
					.unwrap_or(QueryValue::Null),
				"BOOLEAN" => row
					.try_get::<bool, _>(index)
					.map(QueryValue::Bool)
					.unwrap_or(QueryValue::Null),
				_ => row
					.try_get::<String, _>(index)
					.map(QueryValue::String)
					.unwrap_or(QueryValue::Null),
			}
		};
		out.insert(column.name().to_string(), value);
	}
	out
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Sqlite
	}

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		let result = bind_all(sql, &params).execute(&self.pool).await?;
		Ok(QueryResult {
			rows_affected: result.rows_affected(),
		})
	}

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		let row = bind_all(sql, &params).fetch_one(&self.pool).await?;
		Ok(convert_row(&row))
	}

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>> {
		let row = bind_all(sql, &params).fetch_optional(&self.pool).await?;
		Ok(row.as_ref().map(convert_row))
	}

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		let rows = bind_all(sql, &params).fetch_all(&self.pool).await?;
		Ok(rows.iter().map(convert_row).collect())
	}

	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(SqliteTransaction { tx }))
	}

	async fn begin_with_isolation(
		&self,
		_level: IsolationLevel,
	) -> Result<Box<dyn TransactionExecutor>> {
		// SQLite transactions are always serializable.
		self.begin().await
	}
}

struct SqliteTransaction {
	tx: sqlx::Transaction<'static, sqlx::Sqlite>,
}

#[async_trait]
impl TransactionExecutor for SqliteTransaction {
	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult> {
		let result = bind_all(sql, &params).execute(&mut *self.tx).await?;
		Ok(QueryResult {
			rows_affected: result.rows_affected(),
		})
	}

	async fn fetch_one(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Row> {
		let row = bind_all(sql, &params).fetch_one(&mut *self.tx).await?;
		Ok(convert_row(&row))
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>> {
		let rows = bind_all(sql, &params).fetch_all(&mut *self.tx).await?;
		Ok(rows.iter().map(convert_row).collect())
	}

	async fn commit(self: Box<Self>) -> Result<()> {
		self.tx.commit().await?;
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> Result<()> {
		self.tx.rollback().await?;
		Ok(())
	}
}
