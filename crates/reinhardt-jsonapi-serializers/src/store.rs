//! Record and store abstractions
//!
//! The engine never talks to a database directly. Records expose their
//! attributes and relationships through [`Record`], and collections of
//! records are fetched and written through [`RecordStore`]. A
//! [`ModelSchema`] describes the columns of a model so that resource
//! definitions can derive their fields from it.

pub mod query;

pub use query::{FilterPredicate, FilterValue, Lookup, StoreQuery};

use crate::fields::Choice;
use crate::identifier::{Identifier, resource_type_for};
use crate::validation::ValidatedData;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	#[error("Relationship `{field}` on `{model}` was not loaded")]
	NotLoaded { model: String, field: String },

	#[error("`{model}` has no attribute `{field}`")]
	UnknownAttribute { model: String, field: String },

	#[error("`{model}` has no relationship `{field}`")]
	UnknownRelation { model: String, field: String },

	#[error("Integrity error on `{model}`: {message}")]
	Integrity { model: String, message: String },

	#[error("Backend error: {0}")]
	Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage type of a model column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
	Integer,
	Float,
	Boolean,
	Text { max_length: Option<usize> },
	Array {
		child: Box<ColumnKind>,
		size: Option<usize>,
	},
	Json,
	/// Forward reference to a single row of model `to`.
	ForeignKey { to: String },
	/// Forward reference to many rows of model `to`.
	ManyToMany { to: String },
}

impl ColumnKind {
	pub fn is_relation(&self) -> bool {
		matches!(
			self,
			ColumnKind::ForeignKey { .. } | ColumnKind::ManyToMany { .. }
		)
	}

	pub fn related_model(&self) -> Option<&str> {
		match self {
			ColumnKind::ForeignKey { to } | ColumnKind::ManyToMany { to } => Some(to),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
	pub name: String,
	pub kind: ColumnKind,
	pub choices: Option<Vec<Choice>>,
	pub nullable: bool,
	pub blank: bool,
	pub has_default: bool,
	pub primary_key: bool,
	pub auto_created: bool,
}

impl ColumnInfo {
	pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
		Self {
			name: name.into(),
			kind,
			choices: None,
			nullable: false,
			blank: false,
			has_default: false,
			primary_key: false,
			auto_created: false,
		}
	}

	/// Auto-incrementing integer primary key named `id`.
	pub fn auto_id() -> Self {
		Self::new("id", ColumnKind::Integer).primary_key().auto_created()
	}

	pub fn choices(mut self, choices: impl IntoIterator<Item = Choice>) -> Self {
		self.choices = Some(choices.into_iter().collect());
		self
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub fn blank(mut self) -> Self {
		self.blank = true;
		self
	}

	pub fn with_default(mut self) -> Self {
		self.has_default = true;
		self
	}

	pub fn primary_key(mut self) -> Self {
		self.primary_key = true;
		self
	}

	pub fn auto_created(mut self) -> Self {
		self.auto_created = true;
		self
	}

	/// Whether input may omit this column.
	pub fn is_optional(&self) -> bool {
		self.nullable || self.blank || self.has_default || self.auto_created
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
	name: String,
	columns: Vec<ColumnInfo>,
}

impl ModelSchema {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			columns: Vec::new(),
		}
	}

	pub fn column(mut self, column: ColumnInfo) -> Self {
		self.columns.push(column);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn resource_type(&self) -> String {
		resource_type_for(&self.name)
	}

	pub fn columns(&self) -> &[ColumnInfo] {
		&self.columns
	}

	pub fn get(&self, name: &str) -> Option<&ColumnInfo> {
		self.columns.iter().find(|column| column.name == name)
	}

	pub fn primary_key(&self) -> Option<&ColumnInfo> {
		self.columns.iter().find(|column| column.primary_key)
	}

	/// Non-relational columns, in declaration order.
	pub fn scalar_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
		self.columns.iter().filter(|column| !column.kind.is_relation())
	}

	/// Foreign-key and many-to-many columns, in declaration order.
	pub fn forward_relations(&self) -> impl Iterator<Item = &ColumnInfo> {
		self.columns.iter().filter(|column| column.kind.is_relation())
	}
}

pub type RecordRef = Arc<dyn Record>;

/// A single stored object.
///
/// Relationship accessors may need to hit the backing store, so they are
/// async. A record whose relationship was not loaded must return
/// [`StoreError::NotLoaded`] rather than fetching lazily behind the
/// caller's back.
#[async_trait]
pub trait Record: Send + Sync {
	fn schema(&self) -> &ModelSchema;

	fn id(&self) -> Identifier;

	fn model_name(&self) -> &str {
		self.schema().name()
	}

	async fn attribute(&self, name: &str) -> StoreResult<Value>;

	async fn related_one(&self, name: &str) -> StoreResult<Option<RecordRef>>;

	async fn related_many(&self, name: &str) -> StoreResult<Vec<RecordRef>>;
}

/// Persistence backend for one model.
#[async_trait]
pub trait RecordStore: Send + Sync {
	fn schema(&self) -> &ModelSchema;

	async fn get(&self, id: &Identifier) -> StoreResult<Option<RecordRef>>;

	async fn list(&self, query: &StoreQuery) -> StoreResult<Vec<RecordRef>>;

	async fn count(&self, filters: &[FilterPredicate]) -> StoreResult<usize>;

	async fn create(&self, values: &ValidatedData) -> StoreResult<RecordRef>;

	async fn update(&self, id: &Identifier, values: &ValidatedData) -> StoreResult<RecordRef>;

	/// Replaces the targets of relationship `field` on record `id`.
	async fn set_related(
		&self,
		id: &Identifier,
		field: &str,
		targets: &[Identifier],
	) -> StoreResult<()>;
}
