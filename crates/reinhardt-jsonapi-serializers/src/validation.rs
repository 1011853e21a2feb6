//! Input validation
//!
//! A pass over a request document runs in stages:
//!
//! 1. The envelope must be `{"data": {"type": ...}}`.
//! 2. Document validators run against dotted paths into `data`.
//! 3. `attributes` and `relationships` are flattened next to `type` and
//!    `id`; `self` links are dropped and to-many linkage lists are kept
//!    aside so they are not confused with attribute values.
//! 4. Each writable field is coerced and validated, then its hook runs.
//!
//! Field failures are aggregated into an [`ErrorCollection`] so the caller
//! sees every problem in one response. Only non-validation failures abort
//! the pass early.

use crate::document::Linkage;
use crate::error::{SerializerError, SerializerResult};
use crate::fields::{Cardinality, FieldDescriptor, FieldError, NULL_MESSAGE};
use crate::identifier::ResourceIdentifier;
use crate::registry::ResourceDefinition;
use crate::relations::validate_linkage;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

pub const INVALID_OBJECT_MESSAGE: &str = "The field must contain a valid object description.";
pub const EXPECTED_LIST_MESSAGE: &str = "A list of the object identificators is expected.";
pub const OBJECT_LIST_MESSAGE: &str = "Please provide a list of valid objects.";

/// Messages recorded under one error key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorEntry {
	Messages(Vec<String>),
	Nested(IndexMap<String, Vec<String>>),
}

impl ErrorEntry {
	pub fn message(message: impl Into<String>) -> Self {
		ErrorEntry::Messages(vec![message.into()])
	}
}

/// Field errors keyed by field name; nested failures use `field.key`.
pub type ErrorCollection = IndexMap<String, ErrorEntry>;

fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::Number(number) => number.as_f64() == Some(0.0),
		Value::String(text) => text.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
	}
}

fn single_error(key: &str, message: &str) -> ErrorCollection {
	let mut errors = ErrorCollection::new();
	errors.insert(key.to_string(), ErrorEntry::message(message));
	errors
}

/// Values accepted by a successful validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedData {
	attributes: IndexMap<String, Value>,
	relationships: IndexMap<String, Linkage>,
}

impl ValidatedData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn attributes(&self) -> &IndexMap<String, Value> {
		&self.attributes
	}

	pub fn relationships(&self) -> &IndexMap<String, Linkage> {
		&self.relationships
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.attributes.get(name)
	}

	pub fn relationship(&self, name: &str) -> Option<&Linkage> {
		self.relationships.get(name)
	}

	pub fn insert_attribute(&mut self, name: impl Into<String>, value: Value) {
		self.attributes.insert(name.into(), value);
	}

	pub fn insert_relationship(&mut self, name: impl Into<String>, linkage: Linkage) {
		self.relationships.insert(name.into(), linkage);
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty() && self.relationships.is_empty()
	}

	/// Attributes as a JSON object, with linkage under `relationships`.
	pub fn to_value(&self) -> Value {
		let mut object: Map<String, Value> = self
			.attributes
			.iter()
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect();
		if !self.relationships.is_empty() {
			let relationships: Map<String, Value> = self
				.relationships
				.iter()
				.map(|(name, linkage)| {
					(
						name.clone(),
						serde_json::to_value(linkage).unwrap_or(Value::Null),
					)
				})
				.collect();
			object.insert("relationships".to_string(), Value::Object(relationships));
		}
		Value::Object(object)
	}
}

enum Validated {
	Attribute(Value),
	Relationship(Linkage),
	Identity,
}

pub struct ValidationPipeline<'a> {
	definition: &'a ResourceDefinition,
	partial: bool,
}

impl<'a> ValidationPipeline<'a> {
	pub fn new(definition: &'a ResourceDefinition) -> Self {
		Self {
			definition,
			partial: false,
		}
	}

	/// Missing fields are skipped instead of reported.
	pub fn partial(mut self, partial: bool) -> Self {
		self.partial = partial;
		self
	}

	/// Validates a single-resource document.
	///
	/// Returns [`SerializerError::Validation`] with every collected field
	/// error when the input is invalid.
	pub async fn validate(&self, raw: &Value) -> SerializerResult<ValidatedData> {
		let data = Self::envelope(raw)?;
		self.run_document_validators(data).await?;
		let (flat, to_many) = Self::flatten(data);

		let mut errors = ErrorCollection::new();
		let mut validated = ValidatedData::new();
		for (name, descriptor) in self.definition.registry().iter() {
			if descriptor.is_read_only() {
				continue;
			}
			let raw_value = match descriptor.cardinality() {
				Some(_) => to_many.get(name).or_else(|| flat.get(name)),
				None => flat.get(name),
			};
			match self.validate_field(name, descriptor, raw_value).await {
				Ok(Validated::Attribute(value)) => validated.insert_attribute(name, value),
				Ok(Validated::Relationship(linkage)) => validated.insert_relationship(name, linkage),
				Ok(Validated::Identity) => {}
				Err(error) => self.record(&mut errors, name, descriptor, error)?,
			}
		}

		if errors.is_empty() {
			Ok(validated)
		} else {
			tracing::debug!(
				"Validation of {} failed for {} field(s)",
				self.definition.name(),
				errors.len()
			);
			Err(SerializerError::Validation(errors))
		}
	}

	/// Validates a document whose `data` is a list, one member at a time.
	///
	/// The first invalid member stops the pass.
	pub async fn validate_many(&self, raw: &Value) -> SerializerResult<Vec<ValidatedData>> {
		let items = match raw.as_object().and_then(|object| object.get("data")) {
			Some(Value::Array(items)) => items,
			Some(data) if !is_blank(data) => {
				return Err(SerializerError::Validation(single_error(
					"data",
					OBJECT_LIST_MESSAGE,
				)));
			}
			_ => {
				return Err(SerializerError::Validation(single_error(
					"data",
					INVALID_OBJECT_MESSAGE,
				)));
			}
		};
		let mut validated = Vec::with_capacity(items.len());
		for item in items {
			let document = serde_json::json!({ "data": item });
			validated.push(self.validate(&document).await?);
		}
		Ok(validated)
	}

	/// Validates a relationship sub-resource document, `{"data": <linkage>}`,
	/// against the relationship field `name`.
	pub async fn validate_relationship(&self, name: &str, raw: &Value) -> SerializerResult<Linkage> {
		let Some(descriptor) = self.definition.registry().relationships().get(name) else {
			return Err(SerializerError::Field {
				field: name.to_string(),
				message: format!(
					"{} has no relationship named '{}'.",
					self.definition.name(),
					name
				),
			});
		};
		if !raw.as_object().is_some_and(|object| object.contains_key("data")) {
			return Err(SerializerError::Validation(single_error(
				"data",
				INVALID_OBJECT_MESSAGE,
			)));
		}

		let mut errors = ErrorCollection::new();
		match self.validate_field(name, descriptor, Some(raw)).await {
			Ok(Validated::Relationship(linkage)) => return Ok(linkage),
			Ok(_) => {}
			Err(error) => self.record(&mut errors, name, descriptor, error)?,
		}
		Err(SerializerError::Validation(errors))
	}

	/// Files a field failure under its key. Fatal failures abort the pass.
	fn record(
		&self,
		errors: &mut ErrorCollection,
		name: &str,
		descriptor: &FieldDescriptor,
		error: FieldError,
	) -> SerializerResult<()> {
		match error {
			FieldError::Invalid(messages) => {
				errors.insert(name.to_string(), ErrorEntry::Messages(messages));
			}
			FieldError::Nested(nested) => {
				for (key, messages) in nested {
					errors.insert(format!("{}.{}", name, key), ErrorEntry::Messages(messages));
				}
			}
			FieldError::Missing => {
				if descriptor.is_required() && !self.partial {
					errors.insert(name.to_string(), ErrorEntry::message(NULL_MESSAGE));
				}
			}
			FieldError::Skip => {}
			FieldError::Fatal(message) => {
				tracing::error!("Field {} of {} failed: {}", name, self.definition.name(), message);
				return Err(SerializerError::Field {
					field: name.to_string(),
					message,
				});
			}
		}
		Ok(())
	}

	fn envelope(raw: &Value) -> SerializerResult<&Map<String, Value>> {
		let data = match raw.as_object().and_then(|object| object.get("data")) {
			Some(data) => data,
			None => {
				return Err(SerializerError::Validation(single_error(
					"data",
					INVALID_OBJECT_MESSAGE,
				)));
			}
		};
		match data {
			Value::Object(object) if object.contains_key("type") => Ok(object),
			Value::Object(_) => Err(SerializerError::Validation(single_error(
				"data",
				INVALID_OBJECT_MESSAGE,
			))),
			_ => Err(SerializerError::Validation(single_error(
				"data",
				EXPECTED_LIST_MESSAGE,
			))),
		}
	}

	async fn run_document_validators(&self, data: &Map<String, Value>) -> SerializerResult<()> {
		let mut errors = ErrorCollection::new();
		for (path, validator) in self.definition.document_validators() {
			let segments: Vec<&str> = path.split('.').collect();
			let value = match segments.as_slice() {
				[field] => data.get(*field).cloned().ok_or_else(|| SerializerError::Field {
					field: path.clone(),
					message: format!(
						"Serializer field named '{}' was not found. You need to specify an 'attributes' or 'relationships' subfield.",
						field
					),
				})?,
				[section, .., field] => data
					.get(*section)
					.and_then(|section| section.get(*field))
					.cloned()
					.unwrap_or(Value::Null),
				[] => continue,
			};
			match validator.validate(&value).await {
				Ok(()) => {}
				Err(FieldError::Invalid(messages)) => {
					errors.insert(path.clone(), ErrorEntry::Messages(messages));
				}
				Err(FieldError::Nested(nested)) => {
					errors.insert(path.clone(), ErrorEntry::Nested(nested));
				}
				Err(FieldError::Missing) => {
					errors.insert(path.clone(), ErrorEntry::message(NULL_MESSAGE));
				}
				Err(FieldError::Skip) => {}
				Err(FieldError::Fatal(message)) => {
					return Err(SerializerError::Field {
						field: path.clone(),
						message,
					});
				}
			}
		}
		if errors.is_empty() {
			Ok(())
		} else {
			Err(SerializerError::Validation(errors))
		}
	}

	fn flatten(data: &Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
		let mut flat = Map::new();
		let mut to_many = Map::new();
		for (key, value) in data {
			let Value::Object(section) = value else {
				flat.insert(key.clone(), value.clone());
				continue;
			};
			let is_relationships = key == "relationships";
			for (name, member) in section {
				let is_linkage_list = is_relationships
					&& member
						.as_object()
						.and_then(|member| member.get("data"))
						.is_some_and(Value::is_array);
				if is_linkage_list {
					to_many.insert(name.clone(), member.clone());
				} else if name != "self" {
					flat.insert(name.clone(), member.clone());
				}
			}
		}
		(flat, to_many)
	}

	async fn validate_field(
		&self,
		name: &str,
		descriptor: &FieldDescriptor,
		raw: Option<&Value>,
	) -> Result<Validated, FieldError> {
		let Some(raw) = raw else {
			return if self.partial {
				Err(FieldError::Skip)
			} else {
				Err(FieldError::Missing)
			};
		};
		let value = match raw {
			Value::Object(object) if object.contains_key("data") => &object["data"],
			other => other,
		};

		let Some(cardinality) = descriptor.cardinality() else {
			let validated = descriptor.run_validation(value).await?;
			let validated = self.run_hook(name, validated).await?;
			return Ok(if name == "type" {
				Validated::Identity
			} else {
				Validated::Attribute(validated)
			});
		};

		let items: Vec<&Value> = match (cardinality, value) {
			(_, Value::Null) => {
				return if descriptor.allows_null() || !descriptor.is_required() {
					Ok(Validated::Relationship(match cardinality {
						Cardinality::Single => Linkage::Null,
						Cardinality::Multi => Linkage::Many(Vec::new()),
					}))
				} else {
					Err(FieldError::invalid(NULL_MESSAGE))
				};
			}
			(Cardinality::Multi, Value::Array(items)) => items.iter().collect(),
			(_, single) => vec![single],
		};

		let mut identifiers: Vec<ResourceIdentifier> = Vec::with_capacity(items.len());
		for item in items {
			let identifier = validate_linkage(item, descriptor.related_resource_type())?;
			let validated = descriptor.run_validation(&identifier.to_value()).await?;
			let validated = self.run_hook(name, validated).await?;
			let identifier = match serde_json::from_value::<ResourceIdentifier>(validated) {
				Ok(identifier) => identifier,
				Err(_) => identifier,
			};
			identifiers.push(identifier);
		}
		Ok(Validated::Relationship(match cardinality {
			Cardinality::Multi => Linkage::Many(identifiers),
			Cardinality::Single => match identifiers.into_iter().next() {
				Some(identifier) => Linkage::One(identifier),
				None => Linkage::Null,
			},
		}))
	}

	async fn run_hook(&self, name: &str, value: Value) -> Result<Value, FieldError> {
		match self.definition.hook(name) {
			Some(hook) => hook.call(value).await,
			None => Ok(value),
		}
	}
}
