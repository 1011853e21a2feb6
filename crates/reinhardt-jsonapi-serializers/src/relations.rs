//! Relationship resolution and linkage validation

use crate::document::Linkage;
use crate::error::SerializerResult;
use crate::fields::{Cardinality, FieldError, REQUIRED_MESSAGE, type_name};
use crate::identifier::{Identifier, ResourceIdentifier, resource_type_for};
use crate::store::{Record, RecordRef};
use indexmap::IndexMap;
use serde_json::Value;

/// Reads related objects off a record.
pub struct RelationshipResolver;

impl RelationshipResolver {
	/// Returns the objects related to `record` through `field`.
	///
	/// A to-one relation yields zero or one element. Unloaded relations
	/// surface as [`SerializerError::RelationalDataNotLoaded`].
	///
	/// [`SerializerError::RelationalDataNotLoaded`]: crate::SerializerError::RelationalDataNotLoaded
	pub async fn resolve(
		record: &dyn Record,
		field: &str,
		cardinality: Cardinality,
	) -> SerializerResult<Vec<RecordRef>> {
		let related = match cardinality {
			Cardinality::Single => record.related_one(field).await?.into_iter().collect(),
			Cardinality::Multi => record.related_many(field).await?,
		};
		Ok(related)
	}

	/// Identifier of a related record, typed after its own model.
	pub fn identify(record: &dyn Record) -> ResourceIdentifier {
		ResourceIdentifier::new(resource_type_for(record.model_name()), record.id())
	}

	/// Linkage for resolved objects.
	pub fn linkage(related: &[RecordRef], cardinality: Cardinality) -> Linkage {
		match cardinality {
			Cardinality::Multi => Linkage::Many(
				related
					.iter()
					.map(|record| Self::identify(record.as_ref()))
					.collect(),
			),
			Cardinality::Single => match related.first() {
				Some(record) => Linkage::One(Self::identify(record.as_ref())),
				None => Linkage::Null,
			},
		}
	}
}

/// Validates one resource identifier object from request input.
///
/// Errors are keyed by the offending member (`type` or `id`) so the caller
/// can record them as `<relationship>.<member>`.
pub fn validate_linkage(
	value: &Value,
	expected_type: Option<&str>,
) -> Result<ResourceIdentifier, FieldError> {
	let Value::Object(object) = value else {
		return Err(FieldError::invalid(format!(
			"Invalid data. Expected a dictionary, but got {}.",
			type_name(value)
		)));
	};

	let mut errors: IndexMap<String, Vec<String>> = IndexMap::new();
	let resource_type = match object.get("type") {
		None | Some(Value::Null) => {
			errors.insert("type".to_string(), vec![REQUIRED_MESSAGE.to_string()]);
			None
		}
		Some(Value::String(given)) => match expected_type {
			Some(expected) if given != expected => {
				errors.insert(
					"type".to_string(),
					vec![format!("\"{}\" is not a correct object type.", given)],
				);
				None
			}
			_ => Some(given.clone()),
		},
		Some(_) => {
			errors.insert("type".to_string(), vec!["Not a valid string.".to_string()]);
			None
		}
	};
	let id = match object.get("id") {
		None | Some(Value::Null) => {
			errors.insert("id".to_string(), vec![REQUIRED_MESSAGE.to_string()]);
			None
		}
		Some(raw) => match Identifier::from_value(raw) {
			Some(id) => Some(id),
			None => {
				errors.insert(
					"id".to_string(),
					vec!["A valid identifier is required.".to_string()],
				);
				None
			}
		},
	};

	match (resource_type, id) {
		(Some(resource_type), Some(id)) if errors.is_empty() => {
			Ok(ResourceIdentifier { resource_type, id })
		}
		_ => Err(FieldError::Nested(errors)),
	}
}
