//! Fixture models and resource definitions
//!
//! Three models exercise every field kind the engine supports:
//!
//! - `TestIncludedRelation`: scalar columns only
//! - `TestIncluded`: scalar columns plus a foreign key and a many-to-many
//!   relation to `TestIncludedRelation`
//! - `Test`: scalar columns plus a foreign key and a many-to-many relation
//!   to `TestIncluded`

use crate::store::MemoryStore;
use reinhardt_jsonapi_serializers::{
	Choice, ColumnInfo, ColumnKind, Identifier, ModelSchema, ResourceDefinition,
	ResourceSerializer, StoreResult,
};
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;

fn choice_int() -> Vec<Choice> {
	vec![Choice::new(1, "One"), Choice::new(2, "Two")]
}

fn choice_str() -> Vec<Choice> {
	vec![
		Choice::new("UK", "United Kingdom"),
		Choice::new("US", "United States"),
	]
}

/// Adds the six scalar columns shared by every fixture model.
fn scalar_columns(schema: ModelSchema, suffix: &str) -> ModelSchema {
	let name = |base: &str| {
		if suffix.is_empty() {
			base.to_string()
		} else {
			format!("{}_{}", base, suffix)
		}
	};
	schema
		.column(ColumnInfo::auto_id())
		.column(ColumnInfo::new(
			name("text"),
			ColumnKind::Text {
				max_length: Some(128),
			},
		))
		.column(ColumnInfo::new(name("int"), ColumnKind::Integer))
		.column(ColumnInfo::new(name("bool"), ColumnKind::Boolean))
		.column(ColumnInfo::new(name("choice_int"), ColumnKind::Integer).choices(choice_int()))
		.column(
			ColumnInfo::new(
				name("choice_str"),
				ColumnKind::Text {
					max_length: Some(9),
				},
			)
			.choices(choice_str()),
		)
		.column(
			ColumnInfo::new(
				name("array"),
				ColumnKind::Array {
					child: Box::new(ColumnKind::Integer),
					size: Some(2),
				},
			)
			.with_default(),
		)
}

pub fn test_included_relation_schema() -> ModelSchema {
	scalar_columns(ModelSchema::new("TestIncludedRelation"), "included_relation")
}

pub fn test_included_schema() -> ModelSchema {
	scalar_columns(ModelSchema::new("TestIncluded"), "included")
		.column(
			ColumnInfo::new(
				"foreign_key_included",
				ColumnKind::ForeignKey {
					to: "TestIncludedRelation".to_string(),
				},
			)
			.nullable()
			.blank(),
		)
		.column(
			ColumnInfo::new(
				"many_to_many_included",
				ColumnKind::ManyToMany {
					to: "TestIncludedRelation".to_string(),
				},
			)
			.blank(),
		)
}

pub fn test_schema() -> ModelSchema {
	scalar_columns(ModelSchema::new("Test"), "")
		.column(
			ColumnInfo::new(
				"foreign_key",
				ColumnKind::ForeignKey {
					to: "TestIncluded".to_string(),
				},
			)
			.nullable()
			.blank(),
		)
		.column(
			ColumnInfo::new(
				"many_to_many",
				ColumnKind::ManyToMany {
					to: "TestIncluded".to_string(),
				},
			)
			.blank(),
		)
}

fn model_definition(name: &str, schema: ModelSchema) -> Arc<ResourceDefinition> {
	match ResourceDefinition::builder(name).model(schema).all_fields().build() {
		Ok(definition) => Arc::new(definition),
		Err(error) => panic!("fixture definition {} is invalid: {}", name, error),
	}
}

pub fn test_included_relation_definition() -> Arc<ResourceDefinition> {
	model_definition("TestIncludedRelationSerializer", test_included_relation_schema())
}

pub fn test_included_definition() -> Arc<ResourceDefinition> {
	model_definition("TestIncludedSerializer", test_included_schema())
}

pub fn test_definition() -> Arc<ResourceDefinition> {
	model_definition("TestSerializer", test_schema())
}

/// Linked stores for the three fixture models.
#[derive(Debug, Clone)]
pub struct FixtureStores {
	pub test: MemoryStore,
	pub test_included: MemoryStore,
	pub test_included_relation: MemoryStore,
}

impl FixtureStores {
	pub fn new() -> Self {
		let test_included_relation = MemoryStore::new(test_included_relation_schema());
		let test_included = MemoryStore::new(test_included_schema());
		let test = MemoryStore::new(test_schema());
		test_included.link("foreign_key_included", &test_included_relation);
		test_included.link("many_to_many_included", &test_included_relation);
		test.link("foreign_key", &test_included);
		test.link("many_to_many", &test_included);
		Self {
			test,
			test_included,
			test_included_relation,
		}
	}

	/// Seeds two relation rows, two included rows and three test rows.
	///
	/// Test rows 1 and 2 both point at included row 1, so documents built
	/// from them share included resources.
	pub fn populate(&self) -> StoreResult<()> {
		for index in 1..=2 {
			self.test_included_relation
				.insert(scalar_values("included_relation", index))?;
		}
		for index in 1..=2 {
			let mut values = scalar_values("included", index);
			merge(
				&mut values,
				json!({
					"foreign_key_included": index,
					"many_to_many_included": [1, 2],
				}),
			);
			self.test_included.insert(values)?;
		}
		let links = [
			(Value::from(1), json!([1, 2])),
			(Value::from(1), json!([1])),
			(Value::Null, json!([])),
		];
		for (index, (foreign_key, many_to_many)) in links.into_iter().enumerate() {
			let mut values = scalar_values("", index as i64 + 1);
			merge(
				&mut values,
				json!({"foreign_key": foreign_key, "many_to_many": many_to_many}),
			);
			self.test.insert(values)?;
		}
		Ok(())
	}
}

impl Default for FixtureStores {
	fn default() -> Self {
		Self::new()
	}
}

fn merge(target: &mut Value, extra: Value) {
	if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
		target.extend(extra);
	}
}

/// Valid scalar column values for row `index` of a fixture model.
pub fn scalar_values(suffix: &str, index: i64) -> Value {
	let key = |base: &str| {
		if suffix.is_empty() {
			base.to_string()
		} else {
			format!("{}_{}", base, suffix)
		}
	};
	let even = index % 2 == 0;
	let (choice_int, choice_str) = if even { (2, "US") } else { (1, "UK") };
	let mut values = serde_json::Map::new();
	values.insert(key("text"), json!(format!("text {}", index)));
	values.insert(key("int"), json!(index * 10));
	values.insert(key("bool"), json!(even));
	values.insert(key("choice_int"), json!(choice_int));
	values.insert(key("choice_str"), json!(choice_str));
	values.insert(key("array"), json!([index, index + 1]));
	Value::Object(values)
}

/// A valid create document for the `Test` model.
pub fn test_document(id: Option<Identifier>) -> Value {
	let mut data = json!({
		"type": "test",
		"attributes": scalar_values("", 1),
		"relationships": {
			"foreign_key": {"data": {"type": "test-included", "id": 1}},
			"many_to_many": {"data": [{"type": "test-included", "id": 1}]},
		},
	});
	if let (Some(id), Value::Object(object)) = (id, &mut data) {
		object.insert("id".to_string(), id.to_value());
	}
	json!({ "data": data })
}

#[fixture]
pub fn stores() -> FixtureStores {
	FixtureStores::new()
}

#[fixture]
pub fn populated_stores() -> FixtureStores {
	let stores = FixtureStores::new();
	if let Err(error) = stores.populate() {
		panic!("failed to populate fixture stores: {}", error);
	}
	stores
}

#[fixture]
pub fn test_serializer() -> ResourceSerializer {
	ResourceSerializer::new(test_definition())
}
