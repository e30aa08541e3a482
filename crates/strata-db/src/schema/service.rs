//! Schema metadata loader.
//!
//! Reads the `content_type` / `content_field` / `field_choice` tables into
//! a [`ContentSchema`] snapshot. Statements are built with sea-query and
//! executed through the backend trait; the loader never writes. Lookups for
//! unknown or soft-deleted content types fail with
//! [`strata_core::Error::ContentTypeNotFound`]. No caching happens here —
//! a surrounding service layer may memoize.

use std::sync::Arc;

use sea_query::*;
use strata_core::{Error, Result, normalize_name, validate_developer_name};
use uuid::Uuid;

use crate::backends::{DatabaseBackend, DatabaseType, QueryValue, Row};

use super::content_type::ContentType;
use super::field::{ContentTypeField, FieldChoice};
use super::field_type::FieldType;
use super::{ContentSchema, RelatedSchema};

pub const CONTENT_TYPE_TABLE: &str = "content_type";
pub const CONTENT_FIELD_TABLE: &str = "content_field";
pub const FIELD_CHOICE_TABLE: &str = "field_choice";

#[derive(Clone)]
pub struct SchemaService {
	backend: Arc<dyn DatabaseBackend>,
}

impl SchemaService {
	pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
		Self { backend }
	}

	/// Load a content type by developer name.
	pub async fn load(&self, name: &str) -> Result<ContentSchema> {
		let name = normalize_name(name);
		let mut stmt = content_type_select();
		stmt.and_where(Expr::col(Alias::new("name")).eq(name.as_str()));

		let content_type = self
			.fetch_content_type(&stmt)
			.await?
			.ok_or_else(|| Error::ContentTypeNotFound(name))?;
		self.assemble(content_type).await
	}

	/// Load a content type by identity.
	pub async fn load_by_id(&self, id: Uuid) -> Result<ContentSchema> {
		let content_type = self
			.find_by_id(id)
			.await?
			.ok_or_else(|| Error::ContentTypeNotFound(id.to_string()))?;
		self.assemble(content_type).await
	}

	async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentType>> {
		let mut stmt = content_type_select();
		stmt.and_where(Expr::col(Alias::new("id")).eq(id));
		self.fetch_content_type(&stmt).await
	}

	async fn fetch_content_type(&self, stmt: &SelectStatement) -> Result<Option<ContentType>> {
		let (sql, params) = build(stmt, self.backend.database_type());
		let row = self.backend.fetch_optional(&sql, params).await?;
		row.as_ref().map(decode_content_type).transpose()
	}

	/// Attach fields and, per relationship field, the related content type
	/// with its own fields (one level deep — enough to resolve the related
	/// primary field).
	async fn assemble(&self, content_type: ContentType) -> Result<ContentSchema> {
		let fields = self.load_fields(content_type.id, true).await?;

		let mut related = Vec::new();
		for field in fields.iter().filter(|f| f.field_type.needs_related_join()) {
			let target_id = field.related_type.ok_or_else(|| {
				Error::ContentTypeNotFound(format!("target of relation field '{}'", field.name))
			})?;
			let target = self
				.find_by_id(target_id)
				.await?
				.ok_or_else(|| Error::ContentTypeNotFound(target_id.to_string()))?;
			let target_fields = self.load_fields(target.id, false).await?;
			related.push(RelatedSchema {
				field_name: field.name.clone(),
				content_type: target,
				fields: target_fields,
			});
		}

		Ok(ContentSchema {
			content_type,
			fields,
			related,
		})
	}

	async fn load_fields(
		&self,
		content_type_id: Uuid,
		with_choices: bool,
	) -> Result<Vec<ContentTypeField>> {
		let mut stmt = Query::select();
		stmt.columns([
			Alias::new("id"),
			Alias::new("content_type_id"),
			Alias::new("name"),
			Alias::new("label"),
			Alias::new("field_type"),
			Alias::new("position"),
			Alias::new("required"),
			Alias::new("related_type_id"),
		])
		.from(Alias::new(CONTENT_FIELD_TABLE))
		.and_where(Expr::col(Alias::new("content_type_id")).eq(content_type_id))
		.and_where(Expr::col(Alias::new("deleted_at")).is_null())
		.order_by(Alias::new("position"), Order::Asc)
		.order_by(Alias::new("name"), Order::Asc);

		let (sql, params) = build(&stmt, self.backend.database_type());
		let rows = self.backend.fetch_all(&sql, params).await?;
		let mut fields = rows
			.iter()
			.map(decode_field)
			.collect::<Result<Vec<_>>>()?;

		if with_choices {
			self.attach_choices(&mut fields).await?;
		}
		Ok(fields)
	}

	async fn attach_choices(&self, fields: &mut [ContentTypeField]) -> Result<()> {
		let choice_field_ids: Vec<Uuid> = fields
			.iter()
			.filter(|f| f.field_type.has_choices())
			.map(|f| f.id)
			.collect();
		if choice_field_ids.is_empty() {
			return Ok(());
		}

		let mut stmt = Query::select();
		stmt.columns([
			Alias::new("id"),
			Alias::new("field_id"),
			Alias::new("name"),
			Alias::new("label"),
			Alias::new("position"),
		])
		.from(Alias::new(FIELD_CHOICE_TABLE))
		.and_where(Expr::col(Alias::new("field_id")).is_in(choice_field_ids))
		.order_by(Alias::new("field_id"), Order::Asc)
		.order_by(Alias::new("position"), Order::Asc);

		let (sql, params) = build(&stmt, self.backend.database_type());
		let rows = self.backend.fetch_all(&sql, params).await?;

		for row in &rows {
			let field_id: Uuid = row.get("field_id").map_err(Error::database)?;
			let choice = FieldChoice {
				id: row.get("id").map_err(Error::database)?,
				name: row.get("name").map_err(Error::database)?,
				label: row
					.get_opt("label")
					.map_err(Error::database)?
					.unwrap_or_default(),
				position: row.get::<i64>("position").map_err(Error::database)? as i32,
			};
			if let Some(field) = fields.iter_mut().find(|f| f.id == field_id) {
				field.choices.push(choice);
			}
		}
		Ok(())
	}
}

fn content_type_select() -> SelectStatement {
	let mut stmt = Query::select();
	stmt.columns([
		Alias::new("id"),
		Alias::new("name"),
		Alias::new("label"),
		Alias::new("primary_field"),
	])
	.from(Alias::new(CONTENT_TYPE_TABLE))
	.and_where(Expr::col(Alias::new("deleted_at")).is_null());
	stmt
}

/// Render a sea-query statement for the backend's dialect, converting the
/// collected values into backend parameters.
fn build(stmt: &SelectStatement, dialect: DatabaseType) -> (String, Vec<QueryValue>) {
	let (sql, values) = match dialect {
		DatabaseType::Postgres => stmt.build(PostgresQueryBuilder),
		DatabaseType::Mysql => stmt.build(MysqlQueryBuilder),
		DatabaseType::Sqlite => stmt.build(SqliteQueryBuilder),
	};
	let params = values.into_iter().map(to_query_value).collect();
	(sql, params)
}

fn to_query_value(value: Value) -> QueryValue {
	match value {
		Value::Bool(Some(b)) => QueryValue::Bool(b),
		Value::BigInt(Some(i)) => QueryValue::Int(i),
		Value::Int(Some(i)) => QueryValue::Int(i64::from(i)),
		Value::Double(Some(f)) => QueryValue::Float(f),
		Value::String(Some(s)) => QueryValue::String(s),
		Value::Uuid(Some(u)) => QueryValue::Uuid(u),
		Value::ChronoDateTimeUtc(Some(dt)) => QueryValue::Timestamp(dt),
		_ => QueryValue::Null,
	}
}

fn decode_content_type(row: &Row) -> Result<ContentType> {
	Ok(ContentType {
		id: row.get("id").map_err(Error::database)?,
		name: row.get("name").map_err(Error::database)?,
		label: row
			.get_opt("label")
			.map_err(Error::database)?
			.unwrap_or_default(),
		primary_field: row.get("primary_field").map_err(Error::database)?,
		deleted_at: None,
	})
}

fn decode_field(row: &Row) -> Result<ContentTypeField> {
	let name: String = row.get("name").map_err(Error::database)?;
	let name = normalize_name(&name);
	// the compiler interpolates these names into JSON paths, so corrupt
	// metadata must fail here, not there
	validate_developer_name(&name)?;

	let type_name: String = row.get("field_type").map_err(Error::database)?;
	let field_type = FieldType::parse(&type_name).ok_or_else(|| Error::PayloadDecode {
		field: name.clone(),
		reason: format!("unknown field type '{type_name}'"),
	})?;

	Ok(ContentTypeField {
		id: row.get("id").map_err(Error::database)?,
		content_type_id: row.get("content_type_id").map_err(Error::database)?,
		name,
		label: row
			.get_opt("label")
			.map_err(Error::database)?
			.unwrap_or_default(),
		field_type,
		position: row.get::<i64>("position").map_err(Error::database)? as i32,
		required: row
			.get_opt("required")
			.map_err(Error::database)?
			.unwrap_or(false),
		choices: Vec::new(),
		related_type: row.get_opt("related_type_id").map_err(Error::database)?,
		deleted_at: None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::{
		DatabaseError, IsolationLevel, QueryResult, TransactionExecutor,
	};
	use async_trait::async_trait;

	/// Scripted backend: answers metadata queries from in-memory rows, in
	/// the shape the sea-query statements produce.
	struct MockBackend {
		types: Vec<Row>,
		fields: Vec<Row>,
		choices: Vec<Row>,
	}

	#[async_trait]
	impl DatabaseBackend for MockBackend {
		fn database_type(&self) -> DatabaseType {
			DatabaseType::Sqlite
		}

		async fn execute(
			&self,
			_sql: &str,
			_params: Vec<QueryValue>,
		) -> std::result::Result<QueryResult, DatabaseError> {
			Ok(QueryResult { rows_affected: 0 })
		}

		async fn fetch_one(
			&self,
			sql: &str,
			params: Vec<QueryValue>,
		) -> std::result::Result<Row, DatabaseError> {
			self.fetch_optional(sql, params)
				.await?
				.ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))
		}

		async fn fetch_optional(
			&self,
			sql: &str,
			params: Vec<QueryValue>,
		) -> std::result::Result<Option<Row>, DatabaseError> {
			Ok(self.fetch_all(sql, params).await?.into_iter().next())
		}

		async fn fetch_all(
			&self,
			sql: &str,
			params: Vec<QueryValue>,
		) -> std::result::Result<Vec<Row>, DatabaseError> {
			let matches = |row: &Row, key: &str| match (row.data.get(key), params.first()) {
				(Some(a), Some(b)) => a == b,
				_ => false,
			};
			if sql.contains(CONTENT_FIELD_TABLE) {
				Ok(self
					.fields
					.iter()
					.filter(|row| matches(row, "content_type_id"))
					.cloned()
					.collect())
			} else if sql.contains(CONTENT_TYPE_TABLE) {
				let key = if sql.contains("\"name\" =") { "name" } else { "id" };
				Ok(self
					.types
					.iter()
					.filter(|row| matches(row, key))
					.cloned()
					.collect())
			} else {
				Ok(self.choices.clone())
			}
		}

		async fn begin(
			&self,
		) -> std::result::Result<Box<dyn TransactionExecutor>, DatabaseError> {
			Err(DatabaseError::Query("not supported by mock".into()))
		}

		async fn begin_with_isolation(
			&self,
			_level: IsolationLevel,
		) -> std::result::Result<Box<dyn TransactionExecutor>, DatabaseError> {
			self.begin().await
		}
	}

	fn type_row(id: Uuid, name: &str, primary: &str) -> Row {
		let mut row = Row::new();
		row.insert("id", QueryValue::Uuid(id));
		row.insert("name", QueryValue::from(name));
		row.insert("label", QueryValue::from(name));
		row.insert("primary_field", QueryValue::from(primary));
		row
	}

	fn field_row(type_id: Uuid, name: &str, field_type: &str, position: i64) -> Row {
		let mut row = Row::new();
		row.insert("id", QueryValue::Uuid(Uuid::new_v4()));
		row.insert("content_type_id", QueryValue::Uuid(type_id));
		row.insert("name", QueryValue::from(name));
		row.insert("label", QueryValue::from(name));
		row.insert("field_type", QueryValue::from(field_type));
		row.insert("position", QueryValue::Int(position));
		row.insert("required", QueryValue::Bool(false));
		row.insert("related_type_id", QueryValue::Null);
		row
	}

	#[tokio::test]
	async fn loads_a_content_type_with_fields() {
		let type_id = Uuid::new_v4();
		let backend = MockBackend {
			types: vec![type_row(type_id, "post", "title")],
			fields: vec![
				field_row(type_id, "title", "plain_text", 0),
				field_row(type_id, "views", "number", 1),
			],
			choices: Vec::new(),
		};

		let service = SchemaService::new(Arc::new(backend));
		let schema = service.load("Post").await.unwrap();
		assert_eq!(schema.content_type.name, "post");
		assert_eq!(schema.fields.len(), 2);
		assert_eq!(schema.fields[0].name, "title");
		assert_eq!(schema.fields[1].field_type, FieldType::Number);
		assert!(schema.related.is_empty());
	}

	#[tokio::test]
	async fn unknown_content_types_are_not_found() {
		let backend = MockBackend {
			types: Vec::new(),
			fields: Vec::new(),
			choices: Vec::new(),
		};
		let service = SchemaService::new(Arc::new(backend));
		let err = service.load("ghost").await.unwrap_err();
		assert!(matches!(err, Error::ContentTypeNotFound(name) if name == "ghost"));
	}

	#[tokio::test]
	async fn relation_fields_pull_the_target_schema() {
		let type_id = Uuid::new_v4();
		let person_id = Uuid::new_v4();
		let mut author = field_row(type_id, "author", "relation", 1);
		author.insert("related_type_id", QueryValue::Uuid(person_id));

		let backend = MockBackend {
			types: vec![
				type_row(type_id, "post", "title"),
				type_row(person_id, "person", "name"),
			],
			fields: vec![
				field_row(type_id, "title", "plain_text", 0),
				author,
				field_row(person_id, "name", "plain_text", 0),
			],
			choices: Vec::new(),
		};

		let service = SchemaService::new(Arc::new(backend));
		let schema = service.load("post").await.unwrap();
		assert_eq!(schema.related.len(), 1);
		assert_eq!(schema.related[0].content_type.name, "person");
		assert_eq!(
			schema.related[0].primary_field().unwrap().name,
			"name"
		);
	}

	#[tokio::test]
	async fn corrupt_field_types_fail_loudly() {
		let type_id = Uuid::new_v4();
		let backend = MockBackend {
			types: vec![type_row(type_id, "post", "title")],
			fields: vec![field_row(type_id, "title", "hologram", 0)],
			choices: Vec::new(),
		};
		let service = SchemaService::new(Arc::new(backend));
		let err = service.load("post").await.unwrap_err();
		assert!(matches!(err, Error::PayloadDecode { .. }));
	}
}
