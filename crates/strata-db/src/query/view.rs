//! Saved views.
//!
//! A view is an operator-authored query over one content type: filters,
//! sort, column visibility and paging defaults. The engine consumes views
//! read-only; whether caller-supplied overrides are honored is the view
//! author's call via the `locked` flag.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::records::QueryRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
	pub id: Uuid,
	pub name: String,
	/// Developer name of the content type this view queries.
	pub content_type: String,
	/// Filter-language strings, AND-combined like request filters.
	pub filters: Vec<String>,
	/// `field direction[, field direction]*`
	pub order_by: Option<String>,
	/// Column-visibility list for the consuming UI; passed through, not
	/// interpreted by the engine.
	pub columns: Vec<String>,
	pub page_size: Option<i64>,
	/// When set, caller-supplied filter/search/order are ignored.
	pub locked: bool,
}

impl View {
	/// Merge this view into a caller request, honoring the lock flag.
	///
	/// Locked views replace the caller's filters, search and ordering
	/// outright. Unlocked views contribute their filters as additional
	/// AND clauses and fill in ordering/paging only where the caller left
	/// them unset. Pagination position always remains the caller's.
	pub fn apply(&self, request: &QueryRequest) -> QueryRequest {
		let mut merged = request.clone();
		merged.content_type = self.content_type.clone();

		if self.locked {
			merged.filters = self.filters.clone();
			merged.order_by = self.order_by.clone();
			merged.search = None;
			merged.search_columns = Vec::new();
			merged.page_size = self.page_size.or(request.page_size);
		} else {
			let mut filters = self.filters.clone();
			filters.extend(request.filters.iter().cloned());
			merged.filters = filters;
			merged.order_by = request.order_by.clone().or_else(|| self.order_by.clone());
			merged.page_size = request.page_size.or(self.page_size);
		}

		merged
	}
}
