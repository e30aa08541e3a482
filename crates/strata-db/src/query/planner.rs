//! Query planner.
//!
//! Assembles the full SELECT: projection triads for the base record and
//! every relationship slot, the LEFT JOIN chain (audit users, route, one
//! join group per relationship), WHERE (content-type equality ∧ search ∧
//! filter clauses), ORDER BY, LIMIT/OFFSET — and the COUNT(*) variant of
//! the same statement.
//!
//! Planning is pure: identical `(schema, request, config, dialect)` inputs
//! produce byte-identical SQL text and parameter lists. Relationship slots
//! are numbered in field position order, so alias assignment is stable for
//! a given schema snapshot.

use strata_core::{EngineConfig, Error, Result};

use crate::backends::{DatabaseType, QueryValue};
use crate::filter::parse_filter;
use crate::records::{QueryRequest, SortDirection};
use crate::schema::{ContentSchema, FieldType, ResolvedField};

use super::compiler::{BASE_ALIAS, FilterCompiler, relation_alias};
use super::fragment::SqlFragment;
use super::search::SearchCompiler;

/// Record table holding one payload column plus the native reserved
/// columns. This layout is an engine invariant and identical for every
/// content type.
pub const ITEM_TABLE: &str = "content_item";
pub const USER_TABLE: &str = "users";
pub const ROUTE_TABLE: &str = "routes";

const ITEM_COLUMNS: [&str; 8] = [
	"id",
	"content_type_id",
	"payload",
	"template",
	"created_at",
	"updated_at",
	"created_by",
	"modified_by",
];
const USER_COLUMNS: [&str; 4] = ["id", "username", "given_name", "family_name"];
const ROUTE_COLUMNS: [&str; 2] = ["id", "path"];

/// A planned query, ready to render and execute.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
	pub select: SqlFragment,
	pub count: SqlFragment,
	/// Normalized 1-based page number.
	pub page: i64,
	/// Clamped page size.
	pub page_size: i64,
}

pub struct QueryPlanner<'a> {
	schema: &'a ContentSchema,
	config: &'a EngineConfig,
	dialect: DatabaseType,
}

impl<'a> QueryPlanner<'a> {
	pub fn new(schema: &'a ContentSchema, config: &'a EngineConfig, dialect: DatabaseType) -> Self {
		Self {
			schema,
			config,
			dialect,
		}
	}

	/// Plan the paged listing and its count query.
	pub fn plan(&self, request: &QueryRequest) -> Result<PlannedQuery> {
		let where_clause = self.where_clause(request)?;
		let order_clause = self.order_clause(request)?;

		let page = request.page.max(1);
		let page_size = self.config.clamp_page_size(request.page_size);
		let offset = (page - 1) * page_size;

		let mut select = SqlFragment::raw(format!("SELECT {}", self.projection()));
		select.push_fragment(self.join_chain());
		select.push_fragment(where_clause.clone());
		select.push(&format!(" ORDER BY {order_clause}"));
		select.push(&format!(" LIMIT {page_size} OFFSET {offset}"));

		let mut count = SqlFragment::raw("SELECT COUNT(*) AS total");
		count.push_fragment(self.join_chain());
		count.push_fragment(where_clause);

		Ok(PlannedQuery {
			select,
			count,
			page,
			page_size,
		})
	}

	/// Plan a single-record fetch by id: same projection and joins, no
	/// paging.
	pub fn plan_single(&self, id: uuid::Uuid) -> SqlFragment {
		let mut select = SqlFragment::raw(format!("SELECT {}", self.projection()));
		select.push_fragment(self.join_chain());
		select.push(&format!(
			" WHERE {BASE_ALIAS}.content_type_id = "
		));
		select.push_param(QueryValue::Uuid(self.schema.content_type.id));
		select.push(&format!(" AND {BASE_ALIAS}.id = "));
		select.push_param(QueryValue::Uuid(id));
		select
	}

	/// Projection: the reserved triad for the base record, its audit users
	/// and route, then the same triad per relationship slot.
	fn projection(&self) -> String {
		let mut columns: Vec<String> = Vec::new();
		push_item_columns(&mut columns, BASE_ALIAS);
		push_user_columns(&mut columns, "cu");
		push_user_columns(&mut columns, "mu");
		push_route_columns(&mut columns, "r");

		for (slot, _, _) in self.schema.relation_slots() {
			let alias = relation_alias(slot);
			push_item_columns(&mut columns, &alias);
			push_user_columns(&mut columns, &format!("{alias}cu"));
			push_user_columns(&mut columns, &format!("{alias}mu"));
			push_route_columns(&mut columns, &format!("{alias}r"));
		}

		columns.join(", ")
	}

	/// FROM plus the LEFT JOIN chain. Relationship rows are matched by
	/// extracting the stored foreign key from the payload; the extra
	/// content-type guard keeps a stale key from attaching a record of the
	/// wrong type.
	fn join_chain(&self) -> SqlFragment {
		let mut fragment = SqlFragment::raw(format!(" FROM {ITEM_TABLE} AS {BASE_ALIAS}"));
		push_user_join(&mut fragment, "cu", BASE_ALIAS, "created_by");
		push_user_join(&mut fragment, "mu", BASE_ALIAS, "modified_by");
		push_route_join(&mut fragment, "r", BASE_ALIAS);

		for (slot, field, related) in self.schema.relation_slots() {
			let alias = relation_alias(slot);
			let fk = FieldType::Relation
				.extract_expr(
					self.dialect,
					&format!("{BASE_ALIAS}.payload"),
					&field.name,
					self.config,
				)
				.into_parts()
				.0;
			let id_expr = match self.dialect {
				DatabaseType::Postgres => format!("{alias}.id::text"),
				DatabaseType::Mysql | DatabaseType::Sqlite => format!("{alias}.id"),
			};

			fragment.push(&format!(
				" LEFT JOIN {ITEM_TABLE} AS {alias} ON {id_expr} = ({fk}) AND {alias}.content_type_id = "
			));
			fragment.push_param(QueryValue::Uuid(related.content_type.id));

			push_user_join(&mut fragment, &format!("{alias}cu"), &alias, "created_by");
			push_user_join(&mut fragment, &format!("{alias}mu"), &alias, "modified_by");
			push_route_join(&mut fragment, &format!("{alias}r"), &alias);
		}

		fragment
	}

	/// WHERE: content-type equality ∧ search clause ∧ each filter string as
	/// one parenthesized AND-combined clause.
	fn where_clause(&self, request: &QueryRequest) -> Result<SqlFragment> {
		let mut fragment = SqlFragment::raw(format!(" WHERE {BASE_ALIAS}.content_type_id = "));
		fragment.push_param(QueryValue::Uuid(self.schema.content_type.id));

		if let Some(term) = request.search.as_deref().filter(|t| !t.trim().is_empty()) {
			let search = SearchCompiler::new(self.schema, self.config, self.dialect)
				.compile(term.trim(), &request.search_columns)?;
			fragment.push(" AND ");
			fragment.push_fragment(search);
		}

		for filter in &request.filters {
			let node = parse_filter(filter)?;
			let compiled =
				FilterCompiler::new(self.schema, self.config, self.dialect, filter).compile(&node)?;
			fragment.push(" AND (");
			fragment.push_fragment(compiled);
			fragment.push(")");
		}

		Ok(fragment)
	}

	/// ORDER BY with a trailing `c.id ASC` tiebreak so paging is a total
	/// order even when sort keys collide.
	fn order_clause(&self, request: &QueryRequest) -> Result<String> {
		let mut entries: Vec<String> = Vec::new();

		if let Some(order) = request.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
			for part in order.split(',') {
				let mut words = part.split_whitespace();
				let field = words.next().ok_or_else(|| {
					Error::InvalidRequest(format!("empty entry in order-by '{order}'"))
				})?;
				let direction = match words.next() {
					None => SortDirection::Asc,
					Some(word) => SortDirection::parse(word).ok_or_else(|| {
						Error::InvalidRequest(format!(
							"unknown sort direction '{word}' in order-by '{order}'"
						))
					})?,
				};
				if let Some(extra) = words.next() {
					return Err(Error::InvalidRequest(format!(
						"unexpected '{extra}' in order-by '{order}'"
					)));
				}

				let expr = self.sort_expr(field)?;
				entries.push(format!("{expr} {}", direction.to_sql()));
			}
		} else {
			entries.push(format!("{BASE_ALIAS}.created_at DESC"));
		}

		entries.push(format!("{BASE_ALIAS}.id ASC"));
		Ok(entries.join(", "))
	}

	/// Resolve one sort field. Unrecognized fields fail the query — the
	/// same loud policy as malformed filters.
	fn sort_expr(&self, field: &str) -> Result<String> {
		match self.schema.resolve(field)? {
			ResolvedField::Reserved(reserved) => reserved
				.order_expr(BASE_ALIAS)
				.ok_or_else(|| Error::field_not_found(&self.schema.content_type.name, field)),
			ResolvedField::Custom(custom) => {
				if custom.field_type == FieldType::Relation {
					let (slot, related) = self
						.schema
						.relation_slot(&custom.name)
						.ok_or_else(|| {
							Error::field_not_found(&self.schema.content_type.name, field)
						})?;
					let primary = related.primary_field()?;
					Ok(primary.field_type.order_expr(
						self.dialect,
						&format!("{}.payload", relation_alias(slot)),
						&primary.name,
					))
				} else {
					Ok(custom.field_type.order_expr(
						self.dialect,
						&format!("{BASE_ALIAS}.payload"),
						&custom.name,
					))
				}
			}
		}
	}
}

fn push_item_columns(columns: &mut Vec<String>, alias: &str) {
	for column in ITEM_COLUMNS {
		columns.push(format!("{alias}.{column} AS {alias}__{column}"));
	}
}

fn push_user_columns(columns: &mut Vec<String>, alias: &str) {
	for column in USER_COLUMNS {
		columns.push(format!("{alias}.{column} AS {alias}__{column}"));
	}
}

fn push_route_columns(columns: &mut Vec<String>, alias: &str) {
	for column in ROUTE_COLUMNS {
		columns.push(format!("{alias}.{column} AS {alias}__{column}"));
	}
}

fn push_user_join(fragment: &mut SqlFragment, alias: &str, owner: &str, column: &str) {
	fragment.push(&format!(
		" LEFT JOIN {USER_TABLE} AS {alias} ON {alias}.username = {owner}.{column}"
	));
}

fn push_route_join(fragment: &mut SqlFragment, alias: &str, owner: &str) {
	fragment.push(&format!(
		" LEFT JOIN {ROUTE_TABLE} AS {alias} ON {alias}.item_id = {owner}.id"
	));
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::records::QueryRequest;
	use crate::schema::{ContentType, ContentTypeField, RelatedSchema};
	use uuid::Uuid;

	fn schema_with_relation() -> ContentSchema {
		let type_id = Uuid::new_v4();
		let related_id = Uuid::new_v4();
		ContentSchema {
			content_type: ContentType {
				id: type_id,
				name: "post".into(),
				label: "Post".into(),
				primary_field: "title".into(),
				deleted_at: None,
			},
			fields: vec![
				ContentTypeField::new(type_id, "title", FieldType::PlainText, 0),
				ContentTypeField::new(type_id, "views", FieldType::Number, 1),
				ContentTypeField::new(type_id, "featured", FieldType::Boolean, 2),
				ContentTypeField::new(type_id, "author", FieldType::Relation, 3)
					.with_related_type(related_id),
			],
			related: vec![RelatedSchema {
				field_name: "author".into(),
				content_type: ContentType {
					id: related_id,
					name: "person".into(),
					label: "Person".into(),
					primary_field: "name".into(),
					deleted_at: None,
				},
				fields: vec![ContentTypeField::new(
					related_id,
					"name",
					FieldType::PlainText,
					0,
				)],
			}],
		}
	}

	fn planner_plan(request: &QueryRequest) -> Result<PlannedQuery> {
		let schema = schema_with_relation();
		let config = EngineConfig::default();
		QueryPlanner::new(&schema, &config, DatabaseType::Sqlite).plan(request)
	}

	#[test]
	fn identical_inputs_produce_identical_statements() {
		let request = QueryRequest::new("post")
			.search("rust")
			.filter("featured istrue")
			.order_by("views desc")
			.page(2, 10);

		let schema = schema_with_relation();
		let config = EngineConfig::default();
		let a = QueryPlanner::new(&schema, &config, DatabaseType::Sqlite)
			.plan(&request)
			.unwrap();
		let b = QueryPlanner::new(&schema, &config, DatabaseType::Sqlite)
			.plan(&request)
			.unwrap();
		assert_eq!(a.select.sql(), b.select.sql());
		assert_eq!(a.select.params(), b.select.params());
		assert_eq!(a.count.sql(), b.count.sql());
		assert_eq!(a.count.params(), b.count.params());
	}

	#[test]
	fn select_carries_projection_joins_where_order_and_paging() {
		let request = QueryRequest::new("post")
			.filter("featured istrue")
			.order_by("views desc")
			.page(2, 10);
		let plan = planner_plan(&request).unwrap();
		let sql = plan.select.sql();

		assert!(sql.starts_with("SELECT c.id AS c__id, "));
		assert!(sql.contains("cu.given_name AS cu__given_name"));
		assert!(sql.contains("rel0.payload AS rel0__payload"));
		assert!(sql.contains("rel0r.path AS rel0r__path"));
		assert!(sql.contains(" FROM content_item AS c"));
		assert!(sql.contains("LEFT JOIN users AS cu ON cu.username = c.created_by"));
		assert!(sql.contains("LEFT JOIN routes AS r ON r.item_id = c.id"));
		assert!(sql.contains(
			"LEFT JOIN content_item AS rel0 ON rel0.id = (json_extract(c.payload, '$.author'))"
		));
		assert!(sql.contains("WHERE c.content_type_id = ?"));
		assert!(sql.contains("AND (json_extract(c.payload, '$.featured') = ?)"));
		assert!(sql.contains("ORDER BY json_extract(c.payload, '$.views') DESC, c.id ASC"));
		assert!(sql.ends_with("LIMIT 10 OFFSET 10"));
	}

	#[test]
	fn count_variant_drops_projection_order_and_paging() {
		let request = QueryRequest::new("post").filter("featured istrue");
		let plan = planner_plan(&request).unwrap();
		let sql = plan.count.sql();

		assert!(sql.starts_with("SELECT COUNT(*) AS total FROM content_item AS c"));
		assert!(!sql.contains("ORDER BY"));
		assert!(!sql.contains("LIMIT"));
		// same parameter bindings as the select, minus none — joins and
		// where carry them all
		assert_eq!(plan.count.params(), plan.select.params());
	}

	#[test]
	fn page_below_one_serves_the_first_page() {
		let request = QueryRequest::new("post").page(0, 10);
		let plan = planner_plan(&request).unwrap();
		assert_eq!(plan.page, 1);
		assert!(plan.select.sql().ends_with("LIMIT 10 OFFSET 0"));
	}

	#[test]
	fn default_order_is_newest_first_with_stable_tiebreak() {
		let request = QueryRequest::new("post");
		let plan = planner_plan(&request).unwrap();
		assert!(plan
			.select
			.sql()
			.contains("ORDER BY c.created_at DESC, c.id ASC"));
	}

	#[test]
	fn unrecognized_sort_fields_fail_loudly() {
		let request = QueryRequest::new("post").order_by("ghost desc");
		let err = planner_plan(&request).unwrap_err();
		assert!(matches!(err, Error::FieldNotFound { .. }));
	}

	#[test]
	fn malformed_order_by_is_an_invalid_request() {
		let request = QueryRequest::new("post").order_by("views sideways");
		let err = planner_plan(&request).unwrap_err();
		assert!(matches!(err, Error::InvalidRequest(_)));
	}

	#[test]
	fn sorting_by_a_relation_orders_by_the_related_primary_field() {
		let request = QueryRequest::new("post").order_by("author asc");
		let plan = planner_plan(&request).unwrap();
		assert!(plan
			.select
			.sql()
			.contains("ORDER BY json_extract(rel0.payload, '$.name') ASC, c.id ASC"));
	}

	#[test]
	fn relation_join_binds_the_related_type_id() {
		let schema = schema_with_relation();
		let config = EngineConfig::default();
		let plan = QueryPlanner::new(&schema, &config, DatabaseType::Sqlite)
			.plan(&QueryRequest::new("post"))
			.unwrap();

		let related_id = schema.related[0].content_type.id;
		assert!(plan
			.select
			.params()
			.contains(&QueryValue::Uuid(related_id)));
	}

	#[test]
	fn filter_clauses_are_parenthesized_and_and_combined() {
		let request = QueryRequest::new("post")
			.filter("featured istrue")
			.filter("views gt '10' or views lt '2'");
		let plan = planner_plan(&request).unwrap();
		let sql = plan.select.sql();

		let first = sql.find("AND (json_extract(c.payload, '$.featured') = ?)");
		let second = sql.find(
			"AND ((json_extract(c.payload, '$.views') > ? OR json_extract(c.payload, '$.views') < ?))",
		);
		assert!(first.is_some());
		assert!(second.is_some());
		assert!(first < second);
	}

	#[test]
	fn postgres_rendering_numbers_every_placeholder() {
		let schema = schema_with_relation();
		let config = EngineConfig::default();
		let plan = QueryPlanner::new(&schema, &config, DatabaseType::Postgres)
			.plan(&QueryRequest::new("post").filter("views ge '5'"))
			.unwrap();

		let (sql, params) = plan.select.render(DatabaseType::Postgres);
		assert!(!sql.contains('?'));
		for index in 1..=params.len() {
			assert!(sql.contains(&format!("${index}")));
		}
	}
}
