//! # Strata
//!
//! A dynamic content query engine for multi-tenant content platforms.
//!
//! Strata lets an operator define record schemas at runtime — content types
//! with typed, orderable, optional fields, including one-to-one links to
//! other content types — and then query instances of those schemas. Filter
//! expressions, free-text search, multi-field sorting and pagination are
//! compiled into a single parameterized SQL statement over rows whose custom
//! attributes live in one semi-structured payload column.
//!
//! ## Crates
//!
//! - [`strata_core`] (re-exported as [`core`]) — error taxonomy, developer
//!   name validation, engine configuration
//! - [`strata_db`] (re-exported as [`db`]) — backend abstraction, schema
//!   model, filter language, SQL compilation, query planning, row mapping
//!   and snapshot iteration
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! let backend = SqliteBackend::connect("sqlite::memory:").await?;
//! let engine = QueryEngine::new(Arc::new(backend), EngineConfig::default());
//!
//! let request = QueryRequest::new("post")
//!     .filter("featured eq 'true'")
//!     .order_by("views desc")
//!     .page(1, 20);
//!
//! let page = engine.fetch_page(&request).await?;
//! println!("{} of {} items", page.items.len(), page.total);
//! ```

pub use strata_core as core;
pub use strata_db as db;

pub use strata_core::{EngineConfig, Error, Result};
pub use strata_db::backends::{DatabaseBackend, DatabaseType, QueryValue, Row};
pub use strata_db::query::{QueryEngine, SnapshotPager};
pub use strata_db::records::{ContentItem, ItemPage, QueryRequest};
pub use strata_db::schema::{ContentSchema, ContentType, ContentTypeField, FieldType, SchemaService};

/// Commonly used types, importable in one line.
pub mod prelude {
	pub use strata_core::{EngineConfig, Error, Result};

	pub use strata_db::backends::{
		DatabaseBackend, DatabaseType, IsolationLevel, QueryResult, QueryValue, Row,
		TransactionExecutor,
	};
	pub use strata_db::filter::{FilterNode, FilterOperator, GroupOperator};
	pub use strata_db::query::{QueryEngine, SnapshotPager, View};
	pub use strata_db::records::{
		ContentItem, FieldValue, ItemPage, QueryRequest, Route, SortDirection, UserRef,
	};
	pub use strata_db::schema::{
		ContentSchema, ContentType, ContentTypeField, FieldChoice, FieldType, ReservedField,
		SchemaService,
	};

	#[cfg(feature = "postgres")]
	pub use strata_db::backends::PostgresBackend;
	#[cfg(feature = "sqlite")]
	pub use strata_db::backends::SqliteBackend;
}
