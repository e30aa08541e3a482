//! Snapshot page iterator.
//!
//! Drives repeated paged queries under one read-consistent transaction for
//! bulk export and migration. The total count is computed once; every page
//! observes the same snapshot even if concurrent writers commit
//! mid-iteration. The transaction commits only after the caller drains the
//! sequence (or calls [`SnapshotPager::finish`]); dropping the pager midway
//! rolls it back through the transaction's own drop path.
//!
//! The pager pins one connection and one open transaction for its whole
//! lifetime — callers must bound how long they iterate.

use futures::stream::{self, Stream, TryStreamExt};
use strata_core::{EngineConfig, Result};
use tracing::{debug, warn};

use crate::backends::{DatabaseBackend, DatabaseType, IsolationLevel, TransactionExecutor};
use crate::records::{ContentItem, QueryRequest};
use crate::schema::ContentSchema;

use super::mapper::RowMapper;
use super::planner::QueryPlanner;

pub struct SnapshotPager {
	tx: Option<Box<dyn TransactionExecutor>>,
	schema: ContentSchema,
	config: EngineConfig,
	dialect: DatabaseType,
	request: QueryRequest,
	total: i64,
	total_pages: i64,
	next_page: i64,
}

impl SnapshotPager {
	/// Open the snapshot: begin a REPEATABLE READ transaction and compute
	/// the total count inside it.
	pub(crate) async fn open(
		backend: &dyn DatabaseBackend,
		schema: ContentSchema,
		config: EngineConfig,
		request: QueryRequest,
	) -> Result<Self> {
		let dialect = backend.database_type();
		let mut tx = backend
			.begin_with_isolation(IsolationLevel::RepeatableRead)
			.await?;

		let plan = QueryPlanner::new(&schema, &config, dialect).plan(&request)?;
		let (sql, params) = plan.count.render(dialect);
		debug!(sql = %sql, "counting snapshot result set");
		let total: i64 = tx
			.fetch_one(&sql, params)
			.await?
			.get("total")
			.map_err(strata_core::Error::database)?;

		let total_pages = if total == 0 {
			0
		} else {
			(total + plan.page_size - 1) / plan.page_size
		};

		Ok(Self {
			tx: Some(tx),
			schema,
			config,
			dialect,
			request,
			total,
			total_pages,
			next_page: 1,
		})
	}

	/// Total matches, as counted once at snapshot open.
	pub fn total(&self) -> i64 {
		self.total
	}

	pub fn total_pages(&self) -> i64 {
		self.total_pages
	}

	/// Fetch the next page, or `None` once the sequence is drained. The
	/// first `None` commits the transaction.
	pub async fn next_page(&mut self) -> Result<Option<Vec<ContentItem>>> {
		if self.next_page > self.total_pages {
			if let Some(tx) = self.tx.take() {
				tx.commit().await?;
			}
			return Ok(None);
		}

		let tx = match self.tx.as_mut() {
			Some(tx) => tx,
			// the transaction is gone (earlier backend failure); the
			// sequence is over
			None => return Ok(None),
		};

		let mut request = self.request.clone();
		request.page = self.next_page;
		let plan = QueryPlanner::new(&self.schema, &self.config, self.dialect).plan(&request)?;
		let (sql, params) = plan.select.render(self.dialect);
		debug!(sql = %sql, page = self.next_page, "fetching snapshot page");

		let rows = match tx.fetch_all(&sql, params).await {
			Ok(rows) => rows,
			Err(err) => {
				// roll back eagerly instead of waiting for drop
				if let Some(tx) = self.tx.take() {
					let _ = tx.rollback().await;
				}
				return Err(err.into());
			}
		};

		let mapper = RowMapper::new(&self.schema);
		let items = rows
			.iter()
			.map(|row| mapper.map_row(row))
			.collect::<Result<Vec<_>>>()?;

		self.next_page += 1;
		Ok(Some(items))
	}

	/// Stop iterating early and release the transaction without consuming
	/// the remaining pages. Rolls back: a partial traversal must not
	/// commit.
	pub async fn abort(mut self) -> Result<()> {
		if let Some(tx) = self.tx.take() {
			tx.rollback().await?;
		}
		Ok(())
	}

	/// Drain-free completion: commits if the sequence was fully consumed,
	/// otherwise rolls back.
	pub async fn finish(mut self) -> Result<()> {
		if let Some(tx) = self.tx.take() {
			if self.next_page > self.total_pages {
				tx.commit().await?;
			} else {
				tx.rollback().await?;
			}
		}
		Ok(())
	}

	/// Adapt the pager into a lazy stream of records. Pages are fetched on
	/// demand; dropping the stream mid-way drops the transaction, which
	/// rolls back.
	pub fn into_stream(self) -> impl Stream<Item = Result<ContentItem>> + Send {
		stream::try_unfold(self, |mut pager| async move {
			Ok::<_, strata_core::Error>(pager.next_page().await?.map(|items| (items, pager)))
		})
		.map_ok(|items| stream::iter(items.into_iter().map(Ok)))
		.try_flatten()
	}
}

impl Drop for SnapshotPager {
	fn drop(&mut self) {
		if self.tx.is_some() {
			// the boxed transaction rolls back when it drops; this is the
			// abandonment path the caller should avoid on purpose
			warn!(
				content_type = %self.request.content_type,
				"snapshot iteration dropped before completion, rolling back"
			);
		}
	}
}
