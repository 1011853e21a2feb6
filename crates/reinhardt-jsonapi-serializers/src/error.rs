//! Error types shared by the serialization engine.

use crate::identifier::Identifier;
use crate::store::StoreError;
use crate::validation::ErrorCollection;
use thiserror::Error;

/// Invalid serializer declarations, detected when a resource definition is
/// built.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
	#[error("Cannot set both 'fields' and 'exclude' options on serializer {serializer}.")]
	FieldsAndExclude { serializer: String },

	#[error(
		"Creating a model serializer without either the 'fields' or the 'exclude' option is disallowed. Add an explicit field selection to the {serializer} serializer."
	)]
	MissingFieldSelection { serializer: String },

	#[error("Field name `{field}` is not valid for model `{model}` in serializer {serializer}.")]
	UnknownField {
		serializer: String,
		model: String,
		field: String,
	},

	#[error(
		"The field '{field}' was declared on serializer {serializer}, but has not been included in the 'fields' option."
	)]
	DeclaredFieldNotIncluded { serializer: String, field: String },

	#[error(
		"Cannot both declare the field '{field}' and include it in the {serializer} 'exclude' option."
	)]
	ExcludedDeclaredField { serializer: String, field: String },

	#[error(
		"The field '{field}' was included on serializer {serializer} in the 'exclude' option, but does not match any model field."
	)]
	ExcludedUnknownField { serializer: String, field: String },

	#[error("Field `{field}` is declared more than once on serializer {serializer}.")]
	DuplicateField { serializer: String, field: String },

	#[error(
		"Serializer {serializer} has no resource type. Set an explicit resource type or attach a model schema."
	)]
	MissingResourceType { serializer: String },
}

/// Errors raised while representing or validating resources.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SerializerError {
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),

	/// Aggregated field errors from a failed validation pass.
	#[error("Validation failed for {} field(s)", .0.len())]
	Validation(ErrorCollection),

	/// A related object collection was read before it had been loaded.
	#[error(
		"Relationship `{field}` on `{model}` was not loaded. Prefetch the related data before serializing."
	)]
	RelationalDataNotLoaded { model: String, field: String },

	#[error("No `{resource_type}` resource found with id {id}")]
	NotFound {
		resource_type: String,
		id: Identifier,
	},

	#[error("Got a store error when calling `{model}.{operation}()`: {message}")]
	Creation {
		model: String,
		operation: &'static str,
		message: String,
	},

	#[error("`{model}` has no readable attribute `{field}`")]
	AttributeNotFound { model: String, field: String },

	/// A field validator or hook failed with something other than a
	/// validation error.
	#[error("Field `{field}` failed: {message}")]
	Field { field: String, message: String },

	/// API misuse, such as reading validated data before validating.
	#[error("{0}")]
	Usage(&'static str),

	#[error("Store error: {0}")]
	Store(StoreError),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl From<StoreError> for SerializerError {
	fn from(error: StoreError) -> Self {
		match error {
			StoreError::NotLoaded { model, field } => {
				SerializerError::RelationalDataNotLoaded { model, field }
			}
			StoreError::UnknownAttribute { model, field } => {
				SerializerError::AttributeNotFound { model, field }
			}
			other => SerializerError::Store(other),
		}
	}
}

impl SerializerError {
	/// Returns the aggregated field errors when this is a validation failure.
	pub fn validation_errors(&self) -> Option<&ErrorCollection> {
		match self {
			SerializerError::Validation(errors) => Some(errors),
			_ => None,
		}
	}
}

pub type SerializerResult<T> = Result<T, SerializerError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_not_loaded_maps_to_relational_data_not_loaded() {
		let error: SerializerError = StoreError::NotLoaded {
			model: "Test".to_string(),
			field: "many_to_many".to_string(),
		}
		.into();
		assert!(matches!(
			error,
			SerializerError::RelationalDataNotLoaded { ref field, .. } if field == "many_to_many"
		));
	}

	#[rstest]
	fn test_backend_error_stays_a_store_error() {
		let error: SerializerError = StoreError::Backend("disk full".to_string()).into();
		assert!(matches!(error, SerializerError::Store(_)));
		assert_eq!(error.to_string(), "Store error: Backend error: disk full");
	}

	#[rstest]
	fn test_configuration_error_message() {
		let error = ConfigurationError::FieldsAndExclude {
			serializer: "TestSerializer".to_string(),
		};
		assert_eq!(
			error.to_string(),
			"Cannot set both 'fields' and 'exclude' options on serializer TestSerializer."
		);
	}
}
