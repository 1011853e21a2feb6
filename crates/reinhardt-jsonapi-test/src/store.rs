//! In-memory [`RecordStore`] backed by ordered maps.
//!
//! Relationship fields are wired to other stores with [`MemoryStore::link`].
//! A field marked with [`MemoryStore::defer`] behaves like a relation that
//! was not prefetched: reading it returns [`StoreError::NotLoaded`].

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use reinhardt_jsonapi_serializers::{
	ColumnKind, FilterPredicate, Identifier, Linkage, ModelSchema, Record, RecordRef, RecordStore,
	ResourceIdentifier, StoreError, StoreQuery, StoreResult, ValidatedData, resource_type_for,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

#[derive(Debug, Clone, Default)]
struct Row {
	attributes: IndexMap<String, Value>,
	one: HashMap<String, Option<Identifier>>,
	many: HashMap<String, Vec<Identifier>>,
}

struct Inner {
	schema: ModelSchema,
	rows: RwLock<IndexMap<Identifier, Row>>,
	next_id: AtomicI64,
	links: RwLock<HashMap<String, MemoryStore>>,
	deferred: RwLock<HashSet<String>>,
}

#[derive(Clone)]
pub struct MemoryStore {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryStore")
			.field("model", &self.inner.schema.name())
			.field("rows", &self.inner.rows.read().len())
			.finish()
	}
}

impl MemoryStore {
	pub fn new(schema: ModelSchema) -> Self {
		Self {
			inner: Arc::new(Inner {
				schema,
				rows: RwLock::new(IndexMap::new()),
				next_id: AtomicI64::new(1),
				links: RwLock::new(HashMap::new()),
				deferred: RwLock::new(HashSet::new()),
			}),
		}
	}

	/// Resolves relationship `field` against `target`.
	pub fn link(&self, field: impl Into<String>, target: &MemoryStore) {
		self.inner.links.write().insert(field.into(), target.clone());
	}

	/// Makes reads of relationship `field` fail as not loaded.
	pub fn defer(&self, field: impl Into<String>) {
		self.inner.deferred.write().insert(field.into());
	}

	pub fn prefetch_all(&self) {
		self.inner.deferred.write().clear();
	}

	pub fn len(&self) -> usize {
		self.inner.rows.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Inserts a row from a flat JSON object.
	///
	/// Foreign keys are given as ids (or `null`), many-to-many fields as
	/// id arrays. An `id` member is used as the primary key when present.
	pub fn insert(&self, values: Value) -> StoreResult<Identifier> {
		let model = self.inner.schema.name().to_string();
		let Value::Object(mut object) = values else {
			return Err(StoreError::Integrity {
				model,
				message: "expected a JSON object".to_string(),
			});
		};
		let id = match object.remove("id").as_ref().and_then(Identifier::from_value) {
			Some(id) => {
				if let Identifier::Int(number) = id {
					self.inner.next_id.fetch_max(number + 1, AtomicOrdering::SeqCst);
				}
				id
			}
			None => self.allocate_id(),
		};
		let mut data = ValidatedData::new();
		for (name, value) in object {
			match self.inner.schema.get(&name).map(|column| &column.kind) {
				Some(ColumnKind::ForeignKey { .. }) => {
					let linkage = match Identifier::from_value(&value) {
						Some(target) => Linkage::One(self.target_identifier(&name, target)),
						None => Linkage::Null,
					};
					data.insert_relationship(name, linkage);
				}
				Some(ColumnKind::ManyToMany { .. }) => {
					let targets: Vec<Identifier> = value
						.as_array()
						.map(|items| items.iter().filter_map(Identifier::from_value).collect())
						.unwrap_or_else(Vec::new);
					let linkage = Linkage::Many(
						targets
							.into_iter()
							.map(|target| self.target_identifier(&name, target))
							.collect(),
					);
					data.insert_relationship(name, linkage);
				}
				_ => data.insert_attribute(name, value),
			}
		}
		let row = self.row_from(&data, Row::default(), true)?;
		self.inner.rows.write().insert(id.clone(), row);
		Ok(id)
	}

	pub fn record(&self, id: &Identifier) -> Option<RecordRef> {
		let row = self.inner.rows.read().get(id).cloned()?;
		Some(Arc::new(MemoryRecord {
			store: self.clone(),
			id: id.clone(),
			row,
		}))
	}

	fn allocate_id(&self) -> Identifier {
		Identifier::Int(self.inner.next_id.fetch_add(1, AtomicOrdering::SeqCst))
	}

	fn target_identifier(
		&self,
		field: &str,
		id: Identifier,
	) -> ResourceIdentifier {
		let resource_type = self
			.inner
			.schema
			.get(field)
			.and_then(|column| column.kind.related_model())
			.map(resource_type_for)
			.unwrap_or_default();
		ResourceIdentifier::new(resource_type, id)
	}

	fn integrity(&self, message: impl Into<String>) -> StoreError {
		StoreError::Integrity {
			model: self.inner.schema.name().to_string(),
			message: message.into(),
		}
	}

	fn check_targets(&self, field: &str, targets: &[Identifier]) -> StoreResult<()> {
		let links = self.inner.links.read();
		let Some(target) = links.get(field) else {
			return Err(StoreError::UnknownRelation {
				model: self.inner.schema.name().to_string(),
				field: field.to_string(),
			});
		};
		let rows = target.inner.rows.read();
		match targets.iter().find(|id| !rows.contains_key(*id)) {
			Some(missing) => Err(self.integrity(format!(
				"FOREIGN KEY constraint failed: {}.{} -> {}",
				self.inner.schema.name(),
				field,
				missing
			))),
			None => Ok(()),
		}
	}

	/// Applies validated values on top of `row`. With `complete`, every
	/// non-optional column must end up with a value.
	fn row_from(&self, data: &ValidatedData, mut row: Row, complete: bool) -> StoreResult<Row> {
		for (name, value) in data.attributes() {
			match self.inner.schema.get(name) {
				Some(column) if !column.kind.is_relation() && !column.primary_key => {
					row.attributes.insert(name.clone(), value.clone());
				}
				_ => {
					return Err(self.integrity(format!("unexpected field `{}`", name)));
				}
			}
		}
		for (name, linkage) in data.relationships() {
			let ids = linkage.ids();
			match self.inner.schema.get(name).map(|column| &column.kind) {
				Some(ColumnKind::ForeignKey { .. }) => {
					self.check_targets(name, &ids)?;
					row.one.insert(name.clone(), ids.into_iter().next());
				}
				Some(ColumnKind::ManyToMany { .. }) => {
					self.check_targets(name, &ids)?;
					row.many.insert(name.clone(), ids);
				}
				_ => return Err(self.integrity(format!("unexpected relationship `{}`", name))),
			}
		}
		if complete {
			for column in self.inner.schema.columns() {
				if column.primary_key {
					continue;
				}
				match &column.kind {
					ColumnKind::ForeignKey { .. } => {
						row.one.entry(column.name.clone()).or_insert(None);
					}
					ColumnKind::ManyToMany { .. } => {
						row.many.entry(column.name.clone()).or_default();
					}
					_ if row.attributes.contains_key(&column.name) => {}
					_ if column.has_default => {
						let default = match column.kind {
							ColumnKind::Array { .. } => Value::Array(Vec::new()),
							_ => Value::Null,
						};
						row.attributes.insert(column.name.clone(), default);
					}
					_ if column.is_optional() => {
						row.attributes.insert(column.name.clone(), Value::Null);
					}
					_ => {
						return Err(self.integrity(format!(
							"NOT NULL constraint failed: {}.{}",
							self.inner.schema.name(),
							column.name
						)));
					}
				}
			}
		}
		Ok(row)
	}

	fn field_value(&self, id: &Identifier, row: &Row, predicate: &FilterPredicate) -> Value {
		if predicate.field == "id" {
			return id.to_value();
		}
		if let Some(target) = row.one.get(&predicate.field) {
			return target.as_ref().map(Identifier::to_value).unwrap_or(Value::Null);
		}
		if let Some(targets) = row.many.get(&predicate.field) {
			return Value::Array(targets.iter().map(Identifier::to_value).collect());
		}
		row.attributes
			.get(&predicate.field)
			.cloned()
			.unwrap_or(Value::Null)
	}

	fn matching(&self, filters: &[FilterPredicate]) -> Vec<(Identifier, Row)> {
		self.inner
			.rows
			.read()
			.iter()
			.filter(|(id, row)| {
				filters
					.iter()
					.all(|predicate| predicate.matches(&self.field_value(id, row, predicate)))
			})
			.map(|(id, row)| (id.clone(), row.clone()))
			.collect()
	}
}

fn sort_value(id: &Identifier, row: &Row, field: &str) -> Value {
	if field == "id" {
		id.to_value()
	} else {
		row.attributes.get(field).cloned().unwrap_or(Value::Null)
	}
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
	match (left, right) {
		(Value::Number(a), Value::Number(b)) => a
			.as_f64()
			.partial_cmp(&b.as_f64())
			.unwrap_or(Ordering::Equal),
		(Value::String(a), Value::String(b)) => a.cmp(b),
		(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
		(Value::Null, Value::Null) => Ordering::Equal,
		(Value::Null, _) => Ordering::Less,
		(_, Value::Null) => Ordering::Greater,
		(a, b) => a.to_string().cmp(&b.to_string()),
	}
}

#[async_trait]
impl RecordStore for MemoryStore {
	fn schema(&self) -> &ModelSchema {
		&self.inner.schema
	}

	async fn get(&self, id: &Identifier) -> StoreResult<Option<RecordRef>> {
		Ok(self.record(id))
	}

	async fn list(&self, query: &StoreQuery) -> StoreResult<Vec<RecordRef>> {
		let mut rows = self.matching(&query.filters);
		for field in query.order_by.iter().rev() {
			let (field, descending) = match field.strip_prefix('-') {
				Some(field) => (field, true),
				None => (field.as_str(), false),
			};
			rows.sort_by(|(left_id, left), (right_id, right)| {
				let ordering = compare_values(
					&sort_value(left_id, left, field),
					&sort_value(right_id, right, field),
				);
				if descending { ordering.reverse() } else { ordering }
			});
		}
		let limit = query.limit.unwrap_or(usize::MAX);
		Ok(rows
			.into_iter()
			.skip(query.offset)
			.take(limit)
			.map(|(id, row)| -> RecordRef {
				Arc::new(MemoryRecord {
					store: self.clone(),
					id,
					row,
				})
			})
			.collect())
	}

	async fn count(&self, filters: &[FilterPredicate]) -> StoreResult<usize> {
		Ok(self.matching(filters).len())
	}

	async fn create(&self, values: &ValidatedData) -> StoreResult<RecordRef> {
		let row = self.row_from(values, Row::default(), true)?;
		let id = self.allocate_id();
		self.inner.rows.write().insert(id.clone(), row);
		tracing::debug!("Created {} {}", self.inner.schema.name(), id);
		self.record(&id)
			.ok_or_else(|| StoreError::Backend(format!("row {} vanished after insert", id)))
	}

	async fn update(&self, id: &Identifier, values: &ValidatedData) -> StoreResult<RecordRef> {
		let existing = self.inner.rows.read().get(id).cloned().ok_or_else(|| {
			self.integrity(format!("no row with id {}", id))
		})?;
		let row = self.row_from(values, existing, false)?;
		self.inner.rows.write().insert(id.clone(), row);
		self.record(id)
			.ok_or_else(|| StoreError::Backend(format!("row {} vanished after update", id)))
	}

	async fn set_related(
		&self,
		id: &Identifier,
		field: &str,
		targets: &[Identifier],
	) -> StoreResult<()> {
		self.check_targets(field, targets)?;
		let mut rows = self.inner.rows.write();
		let row = rows
			.get_mut(id)
			.ok_or_else(|| self.integrity(format!("no row with id {}", id)))?;
		match self.inner.schema.get(field).map(|column| &column.kind) {
			Some(ColumnKind::ForeignKey { .. }) => {
				row.one.insert(field.to_string(), targets.first().cloned());
			}
			Some(ColumnKind::ManyToMany { .. }) => {
				row.many.insert(field.to_string(), targets.to_vec());
			}
			_ => {
				return Err(StoreError::UnknownRelation {
					model: self.inner.schema.name().to_string(),
					field: field.to_string(),
				});
			}
		}
		Ok(())
	}
}

/// Snapshot of one row, resolving relations through the owning store.
pub struct MemoryRecord {
	store: MemoryStore,
	id: Identifier,
	row: Row,
}

impl MemoryRecord {
	fn related_store(&self, name: &str) -> StoreResult<MemoryStore> {
		if self.store.inner.deferred.read().contains(name) {
			return Err(StoreError::NotLoaded {
				model: self.model_name().to_string(),
				field: name.to_string(),
			});
		}
		self.store
			.inner
			.links
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| self.unknown_relation(name))
	}

	fn unknown_relation(&self, name: &str) -> StoreError {
		StoreError::UnknownRelation {
			model: self.model_name().to_string(),
			field: name.to_string(),
		}
	}
}

#[async_trait]
impl Record for MemoryRecord {
	fn schema(&self) -> &ModelSchema {
		&self.store.inner.schema
	}

	fn id(&self) -> Identifier {
		self.id.clone()
	}

	async fn attribute(&self, name: &str) -> StoreResult<Value> {
		if name == "id" {
			return Ok(self.id.to_value());
		}
		match self.row.attributes.get(name) {
			Some(value) => Ok(value.clone()),
			None => Err(StoreError::UnknownAttribute {
				model: self.model_name().to_string(),
				field: name.to_string(),
			}),
		}
	}

	async fn related_one(&self, name: &str) -> StoreResult<Option<RecordRef>> {
		let target = self
			.row
			.one
			.get(name)
			.ok_or_else(|| self.unknown_relation(name))?;
		let store = self.related_store(name)?;
		Ok(target.as_ref().and_then(|id| store.record(id)))
	}

	async fn related_many(&self, name: &str) -> StoreResult<Vec<RecordRef>> {
		let targets = self
			.row
			.many
			.get(name)
			.ok_or_else(|| self.unknown_relation(name))?;
		let store = self.related_store(name)?;
		Ok(targets.iter().filter_map(|id| store.record(id)).collect())
	}
}
