//! The backend trait pair.

use async_trait::async_trait;

use super::error::Result;
use super::types::{DatabaseType, IsolationLevel, QueryResult, QueryValue, Row};

/// A database the engine can execute parameterized statements against.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to share:
/// each call is independent, the engine holds no connection affinity outside
/// [`DatabaseBackend::begin`].
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
	fn database_type(&self) -> DatabaseType;

	async fn execute(&self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult>;

	async fn fetch_one(&self, sql: &str, params: Vec<QueryValue>) -> Result<Row>;

	async fn fetch_optional(&self, sql: &str, params: Vec<QueryValue>) -> Result<Option<Row>>;

	async fn fetch_all(&self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>>;

	/// Open a transaction at the backend's default isolation level.
	async fn begin(&self) -> Result<Box<dyn TransactionExecutor>>;

	/// Open a transaction at a specific isolation level.
	///
	/// Backends whose engine pins a level (SQLite is always serializable)
	/// may ignore the request.
	async fn begin_with_isolation(
		&self,
		level: IsolationLevel,
	) -> Result<Box<dyn TransactionExecutor>>;
}

/// Statement execution bound to one open transaction.
///
/// Dropping an executor without calling [`TransactionExecutor::commit`]
/// rolls the transaction back; the snapshot iterator relies on this for
/// abandoned iterations.
#[async_trait]
pub trait TransactionExecutor: Send {
	async fn execute(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<QueryResult>;

	async fn fetch_one(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Row>;

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> Result<Vec<Row>>;

	async fn commit(self: Box<Self>) -> Result<()>;

	async fn rollback(self: Box<Self>) -> Result<()>;
}
