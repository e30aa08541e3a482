//! PostgreSQL driver.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use super::backend::{DatabaseBackend, TransactionExecutor};
use super::error::Result;
use super::types::{DatabaseType, IsolationLevel, QueryResult, QueryValue, Row};

#[derive(Debug, Clone)]
pub struct PostgresBackend {
	pool: PgPool,
}

impl PostgresBackend {
	pub async fn connect(url: &str) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(10)
			.connect(url)
			.await?;
		Ok(Self { pool })
	}

	pub fn from_pool(pool: PgPool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_param<'q>(query: PgQuery<'q>, param: &QueryValue) -> PgQuery<'q> {
	match param {
		QueryValue::Null => query.bind(Option::<String>::None),
		QueryValue::Bool(b) => query.bind(*b),
		QueryValue::Int(i) => query.bind(*i),
		QueryValue::Float(f) => query.bind(*f),
		QueryValue::String(s) => query.bind(s.clone()),
		QueryValue::Timestamp(dt) => query.bind(*dt),
		QueryValue::Uuid(u) => query.bind(*u),
	}
}

fn bind_all<'q>(sql: &'q str, params: &[QueryValue]) -> PgQuery<'q> {
	let mut query = sqlx::query(sql);
	for param in params {
		query = bind_param(query, param);
	}
	query
}

fn convert_row(row: &PgRow) -> Row {
	let mut out = Row::new();
	for (index, column) in row.columns().iter().enumerate() {
		let is_null = row
			.try_get_raw(index)
			.map(|value| value.is_null())
			.unwrap_or(true);

		let value = if is_null {
			QueryValue::Null
		} else {
			match column.type_info().name() {
				"INT2" => row
					.try_get::<i16, _>(index)
					.map(|i| QueryValue::Int(i64::from(i)))
					.unwrap_or(QueryValue::Null),
				"INT4" => row
					.try_get::<i32, _>(index)
					.map(|i| QueryValue::Int(i64::from(i)))
					.unwrap_or(QueryValue::Null),
				"INT8" => row
					.try_get::<i64, _>(index)
					.map(QueryValue::Int)
					.unwrap_or(QueryValue::Null),
				"FLOAT4" => row
					.try_get::<f32, _>(index)
					.map(|f| QueryValue::Float(f64::from(f)))
					.unwrap_or(QueryValue::Null),
				"FLOAT8" => row
					.try_get::<f64, _>(index)
					.map(QueryValue::Float)
					.unwrap_or(QueryValue::Null),
				"BOOL" => row
					.try_get::<bool, _>(index)
					.map(QueryValue::Bool)
					.unwrap_or(QueryValue::Null),
				"UUID" => row
					.try_get::<uuid::Uuid, _>(index)
					.map(QueryValue::Uuid)
					.unwrap_or(QueryValue::Null),
				"TIMESTAMPTZ" => row
					.try_get::<chrono::DateTime<chrono::Utc>, _>(index)
					.map(QueryValue::Timestamp)
					.unwrap_or(QueryValue::Null),
				"JSON" | "JSONB" => row
					.try_get::<serde_json::Value, _>(index)
					.map(|v| QueryValue::String(v.to_string()))
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
impl DatabaseBackend for PostgresBackend {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
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
		Ok(Box::new(PostgresTransaction { tx }))
	}

	async fn begin_with_isolation(
		&self,
		level: IsolationLevel,
	) -> Result<Box<dyn TransactionExecutor>> {
		let mut tx = self.pool.begin().await?;
		let set = format!("SET TRANSACTION ISOLATION LEVEL {}", level.to_sql());
		sqlx::query(&set).execute(&mut *tx).await?;
		Ok(Box::new(PostgresTransaction { tx }))
	}
}

struct PostgresTransaction {
	tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl TransactionExecutor for PostgresTransaction {
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
