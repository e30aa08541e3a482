//! Structured records returned to callers, and the query request shape.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A decoded payload value, typed per the field's declared base type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
	Text(String),
	Rich(String),
	Number(f64),
	Boolean(bool),
	Date(DateTime<Utc>),
	Choice(String),
	MultiChoice(Vec<String>),
	Reference(Uuid),
}

impl FieldValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(s) | Self::Rich(s) | Self::Choice(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Boolean(b) => Some(*b),
			_ => None,
		}
	}
}

/// A referenced platform user (creator or last modifier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
	pub id: Uuid,
	pub username: String,
	pub given_name: String,
	pub family_name: String,
}

/// The route registered for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
	pub id: Uuid,
	pub path: String,
}

/// One fully mapped content record: native fields, decoded payload, audit
/// users, route, and — per relationship field — the related record, itself
/// fully mapped. A missing related row (left-join miss) simply leaves the
/// relationship out of `related`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
	pub id: Uuid,
	pub content_type_id: Uuid,
	pub payload: IndexMap<String, FieldValue>,
	pub template: Option<String>,
	pub route: Option<Route>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub created_by: Option<UserRef>,
	pub modified_by: Option<UserRef>,
	pub related: IndexMap<String, ContentItem>,
}

impl ContentItem {
	/// Decoded payload value of one field.
	pub fn field(&self, name: &str) -> Option<&FieldValue> {
		self.payload.get(name)
	}

	/// The related record behind a relationship field, if its row existed.
	pub fn related_item(&self, field: &str) -> Option<&ContentItem> {
		self.related.get(field)
	}
}

/// Sort direction of one order-by entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
	Asc,
	Desc,
}

impl SortDirection {
	pub fn to_sql(&self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}

	pub fn parse(word: &str) -> Option<Self> {
		match word.to_ascii_lowercase().as_str() {
			"asc" => Some(Self::Asc),
			"desc" => Some(Self::Desc),
			_ => None,
		}
	}
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct ItemPage {
	pub items: Vec<ContentItem>,
	pub total: i64,
	/// 1-based page number actually served.
	pub page: i64,
	pub page_size: i64,
}

impl ItemPage {
	pub fn total_pages(&self) -> i64 {
		if self.total == 0 {
			0
		} else {
			(self.total + self.page_size - 1) / self.page_size
		}
	}

	pub fn has_next(&self) -> bool {
		self.page < self.total_pages()
	}

	pub fn has_previous(&self) -> bool {
		self.page > 1
	}
}

/// A declarative query over one content type.
///
/// # Examples
///
/// ```
/// use strata_db::records::QueryRequest;
///
/// let request = QueryRequest::new("post")
///     .search("rust")
///     .filter("featured istrue")
///     .filter("views gt '100'")
///     .order_by("views desc, title asc")
///     .page(2, 25);
/// assert_eq!(request.filters.len(), 2);
/// assert_eq!(request.page, 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
	/// Developer name of the target content type.
	pub content_type: String,
	/// Free-text search term.
	pub search: Option<String>,
	/// Explicit search columns; empty means primary-field-only search.
	pub search_columns: Vec<String>,
	/// Filter-language strings, AND-combined at the top level.
	pub filters: Vec<String>,
	/// `field direction[, field direction]*`
	pub order_by: Option<String>,
	/// 1-based page number; values below 1 serve the first page.
	pub page: i64,
	/// Page size; `None` uses the configured default.
	pub page_size: Option<i64>,
}

impl QueryRequest {
	pub fn new(content_type: impl Into<String>) -> Self {
		Self {
			content_type: content_type.into(),
			page: 1,
			..Default::default()
		}
	}

	pub fn search(mut self, term: impl Into<String>) -> Self {
		self.search = Some(term.into());
		self
	}

	pub fn search_in<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
		self.search_columns = columns.into_iter().map(Into::into).collect();
		self
	}

	pub fn filter(mut self, filter: impl Into<String>) -> Self {
		self.filters.push(filter.into());
		self
	}

	pub fn order_by(mut self, order: impl Into<String>) -> Self {
		self.order_by = Some(order.into());
		self
	}

	pub fn page(mut self, page: i64, page_size: i64) -> Self {
		self.page = page;
		self.page_size = Some(page_size);
		self
	}
}
