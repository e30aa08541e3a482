//! Database backend abstractions.
//!
//! The engine talks to storage exclusively through [`DatabaseBackend`] and
//! [`TransactionExecutor`]: parameterized statement in, [`Row`]s out. The
//! trait keeps the compiler and planner dialect-aware but driver-agnostic —
//! tests run against a scripted mock, production against the `sqlx` drivers.

pub mod backend;
pub mod error;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use backend::{DatabaseBackend, TransactionExecutor};
pub use error::{DatabaseError, Result};
pub use types::{DatabaseType, IsolationLevel, QueryResult, QueryValue, Row};

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
