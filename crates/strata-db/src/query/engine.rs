//! The caller-facing query facade.

use std::sync::Arc;

use strata_core::{EngineConfig, Error, Result};
use tracing::debug;
use uuid::Uuid;

use crate::backends::DatabaseBackend;
use crate::records::{ContentItem, ItemPage, QueryRequest};
use crate::schema::SchemaService;

use super::mapper::RowMapper;
use super::planner::QueryPlanner;
use super::snapshot::SnapshotPager;

/// Stateless query engine over one backend.
///
/// Every call loads the schema snapshot, compiles, executes and maps
/// independently; the engine holds no cache and no locks and is safe to
/// share across tasks.
#[derive(Clone)]
pub struct QueryEngine {
	backend: Arc<dyn DatabaseBackend>,
	schema_service: SchemaService,
	config: EngineConfig,
}

impl QueryEngine {
	pub fn new(backend: Arc<dyn DatabaseBackend>, config: EngineConfig) -> Self {
		Self {
			schema_service: SchemaService::new(backend.clone()),
			backend,
			config,
		}
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn schema_service(&self) -> &SchemaService {
		&self.schema_service
	}

	/// Fetch one page of records plus the total match count.
	pub async fn fetch_page(&self, request: &QueryRequest) -> Result<ItemPage> {
		let schema = self.schema_service.load(&request.content_type).await?;
		let dialect = self.backend.database_type();
		let plan = QueryPlanner::new(&schema, &self.config, dialect).plan(request)?;

		let (count_sql, count_params) = plan.count.render(dialect);
		debug!(sql = %count_sql, "executing count query");
		let total: i64 = self
			.backend
			.fetch_one(&count_sql, count_params)
			.await?
			.get("total")
			.map_err(Error::database)?;

		let (select_sql, select_params) = plan.select.render(dialect);
		debug!(sql = %select_sql, params = select_params.len(), "executing content query");
		let rows = self.backend.fetch_all(&select_sql, select_params).await?;

		let mapper = RowMapper::new(&schema);
		let items = rows
			.iter()
			.map(|row| mapper.map_row(row))
			.collect::<Result<Vec<_>>>()?;

		Ok(ItemPage {
			items,
			total,
			page: plan.page,
			page_size: plan.page_size,
		})
	}

	/// Count matches without fetching records.
	pub async fn count(&self, request: &QueryRequest) -> Result<i64> {
		let schema = self.schema_service.load(&request.content_type).await?;
		let dialect = self.backend.database_type();
		let plan = QueryPlanner::new(&schema, &self.config, dialect).plan(request)?;

		let (sql, params) = plan.count.render(dialect);
		debug!(sql = %sql, "executing count query");
		self.backend
			.fetch_one(&sql, params)
			.await?
			.get("total")
			.map_err(Error::database)
	}

	/// Fetch a single record by id.
	pub async fn get(&self, content_type: &str, id: Uuid) -> Result<ContentItem> {
		let schema = self.schema_service.load(content_type).await?;
		let dialect = self.backend.database_type();
		let fragment = QueryPlanner::new(&schema, &self.config, dialect).plan_single(id);

		let (sql, params) = fragment.render(dialect);
		debug!(sql = %sql, "fetching single record");
		let row = self
			.backend
			.fetch_optional(&sql, params)
			.await?
			.ok_or_else(|| Error::ItemNotFound(id.to_string()))?;

		RowMapper::new(&schema).map_row(&row)
	}

	/// Open a snapshot iteration over every matching record.
	pub async fn snapshot(&self, request: &QueryRequest) -> Result<SnapshotPager> {
		let schema = self.schema_service.load(&request.content_type).await?;
		SnapshotPager::open(
			self.backend.as_ref(),
			schema,
			self.config.clone(),
			request.clone(),
		)
		.await
	}
}
