//! Serializer entry points
//!
//! [`ResourceSerializer`] renders records. Binding it to request input
//! yields a [`BoundSerializer`] that validates at most once and caches the
//! outcome.

use crate::context::SerializationContext;
use crate::document::Document;
use crate::error::{SerializerError, SerializerResult};
use crate::error_format::{ErrorDocument, ErrorFormatter};
use crate::identifier::Identifier;
use crate::registry::ResourceDefinition;
use crate::representation::RepresentationBuilder;
use crate::store::{RecordRef, RecordStore, StoreError};
use crate::validation::{ErrorCollection, ValidatedData, ValidationPipeline};
use serde_json::Value;
use std::sync::Arc;

/// Where a bound serializer is in its validation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
	Unvalidated,
	Valid,
	Invalid,
}

enum State<T> {
	Unvalidated,
	Valid(T),
	Invalid(ErrorCollection),
}

impl<T> State<T> {
	fn status(&self) -> ValidationStatus {
		match self {
			State::Unvalidated => ValidationStatus::Unvalidated,
			State::Valid(_) => ValidationStatus::Valid,
			State::Invalid(_) => ValidationStatus::Invalid,
		}
	}

	fn settle(result: SerializerResult<T>) -> SerializerResult<Self> {
		match result {
			Ok(data) => Ok(State::Valid(data)),
			Err(SerializerError::Validation(errors)) => Ok(State::Invalid(errors)),
			Err(other) => Err(other),
		}
	}

	fn errors(&self) -> SerializerResult<Option<&ErrorCollection>> {
		match self {
			State::Unvalidated => Err(SerializerError::Usage(
				"You must call `.is_valid()` before accessing `.errors`.",
			)),
			State::Valid(_) => Ok(None),
			State::Invalid(errors) => Ok(Some(errors)),
		}
	}

	fn data(&self) -> SerializerResult<&T> {
		match self {
			State::Valid(data) => Ok(data),
			State::Unvalidated => Err(SerializerError::Usage(
				"You must call `.is_valid()` before accessing `.validated_data`.",
			)),
			State::Invalid(_) => Err(SerializerError::Usage(
				"Cannot access `.validated_data` of invalid input.",
			)),
		}
	}
}

#[derive(Debug, Clone)]
pub struct ResourceSerializer {
	definition: Arc<ResourceDefinition>,
	context: SerializationContext,
}

impl ResourceSerializer {
	pub fn new(definition: Arc<ResourceDefinition>) -> Self {
		Self {
			definition,
			context: SerializationContext::default(),
		}
	}

	pub fn with_context(mut self, context: SerializationContext) -> Self {
		self.context = context;
		self
	}

	pub fn definition(&self) -> &ResourceDefinition {
		&self.definition
	}

	pub fn context(&self) -> &SerializationContext {
		&self.context
	}

	/// Renders a single record with its related objects in `included`.
	pub async fn represent(&self, record: &RecordRef) -> SerializerResult<Document> {
		RepresentationBuilder::new(&self.definition, &self.context)
			.represent(record)
			.await
	}

	pub async fn represent_many(&self, records: &[RecordRef]) -> SerializerResult<Document> {
		RepresentationBuilder::new(&self.definition, &self.context)
			.represent_many(records)
			.await
	}

	pub fn bind(&self, data: Value) -> BoundSerializer {
		BoundSerializer {
			serializer: self.clone(),
			initial_data: data,
			partial: false,
			state: State::Unvalidated,
		}
	}

	/// Binds input for a partial update: absent fields are not required.
	pub fn bind_partial(&self, data: Value) -> BoundSerializer {
		BoundSerializer {
			partial: true,
			..self.bind(data)
		}
	}

	pub fn bind_many(&self, data: Value) -> BoundListSerializer {
		BoundListSerializer {
			serializer: self.clone(),
			initial_data: data,
			state: State::Unvalidated,
		}
	}

	fn format_errors(&self, errors: &ErrorCollection) -> Option<ErrorDocument> {
		let source = self.context.base_url();
		ErrorFormatter::new(self.context.settings())
			.with_source(source.as_deref())
			.format(errors)
	}
}

fn creation_error(model: &str, operation: &'static str, error: StoreError) -> SerializerError {
	match error {
		StoreError::NotLoaded { .. } => error.into(),
		other => {
			tracing::error!("{}.{}() failed: {}", model, operation, other);
			SerializerError::Creation {
				model: model.to_string(),
				operation,
				message: other.to_string(),
			}
		}
	}
}

pub struct BoundSerializer {
	serializer: ResourceSerializer,
	initial_data: Value,
	partial: bool,
	state: State<ValidatedData>,
}

impl BoundSerializer {
	pub fn initial_data(&self) -> &Value {
		&self.initial_data
	}

	pub fn status(&self) -> ValidationStatus {
		self.state.status()
	}

	/// Validates the bound input on first call; later calls return the
	/// cached verdict.
	pub async fn is_valid(&mut self) -> SerializerResult<bool> {
		if let State::Unvalidated = self.state {
			let result = ValidationPipeline::new(self.serializer.definition())
				.partial(self.partial)
				.validate(&self.initial_data)
				.await;
			self.state = State::settle(result)?;
		}
		Ok(matches!(self.state, State::Valid(_)))
	}

	pub fn validated_data(&self) -> SerializerResult<&ValidatedData> {
		self.state.data()
	}

	/// Raw collected errors; `None` when the input was valid.
	pub fn raw_errors(&self) -> SerializerResult<Option<&ErrorCollection>> {
		self.state.errors()
	}

	/// Collected errors as a JSON:API error document.
	pub fn errors(&self) -> SerializerResult<Option<ErrorDocument>> {
		Ok(self
			.state
			.errors()?
			.and_then(|errors| self.serializer.format_errors(errors)))
	}

	pub async fn create(&self, store: &dyn RecordStore) -> SerializerResult<RecordRef> {
		let data = self.validated_data()?;
		let model = store.schema().name().to_string();
		store
			.create(data)
			.await
			.map_err(|error| creation_error(&model, "create", error))
	}

	pub async fn update(
		&self,
		store: &dyn RecordStore,
		id: &Identifier,
	) -> SerializerResult<RecordRef> {
		let data = self.validated_data()?;
		let model = store.schema().name().to_string();
		store
			.update(id, data)
			.await
			.map_err(|error| creation_error(&model, "update", error))
	}
}

pub struct BoundListSerializer {
	serializer: ResourceSerializer,
	initial_data: Value,
	state: State<Vec<ValidatedData>>,
}

impl BoundListSerializer {
	pub fn initial_data(&self) -> &Value {
		&self.initial_data
	}

	pub fn status(&self) -> ValidationStatus {
		self.state.status()
	}

	pub async fn is_valid(&mut self) -> SerializerResult<bool> {
		if let State::Unvalidated = self.state {
			let result = ValidationPipeline::new(self.serializer.definition())
				.validate_many(&self.initial_data)
				.await;
			self.state = State::settle(result)?;
		}
		Ok(matches!(self.state, State::Valid(_)))
	}

	pub fn validated_data(&self) -> SerializerResult<&[ValidatedData]> {
		self.state.data().map(Vec::as_slice)
	}

	pub fn raw_errors(&self) -> SerializerResult<Option<&ErrorCollection>> {
		self.state.errors()
	}

	pub fn errors(&self) -> SerializerResult<Option<ErrorDocument>> {
		Ok(self
			.state
			.errors()?
			.and_then(|errors| self.serializer.format_errors(errors)))
	}

	/// Creates every validated member in order.
	pub async fn create(&self, store: &dyn RecordStore) -> SerializerResult<Vec<RecordRef>> {
		let model = store.schema().name().to_string();
		let mut created = Vec::new();
		for data in self.validated_data()? {
			let record = store
				.create(data)
				.await
				.map_err(|error| creation_error(&model, "create", error))?;
			created.push(record);
		}
		Ok(created)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fields::FieldDescriptor;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn serializer() -> ResourceSerializer {
		let definition = ResourceDefinition::builder("ArticleSerializer")
			.resource_type("article")
			.field("title", FieldDescriptor::char())
			.build()
			.unwrap();
		ResourceSerializer::new(Arc::new(definition))
	}

	#[rstest]
	fn test_access_before_validation_is_a_usage_error(serializer: ResourceSerializer) {
		let bound = serializer.bind(json!({"data": {"type": "article"}}));
		assert_eq!(bound.status(), ValidationStatus::Unvalidated);
		assert!(matches!(bound.validated_data(), Err(SerializerError::Usage(_))));
		assert!(matches!(bound.errors(), Err(SerializerError::Usage(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_valid_state_is_cached(serializer: ResourceSerializer) {
		let mut bound = serializer.bind(json!({"data": {"type": "article", "attributes": {"title": "Hi"}}}));
		assert!(bound.is_valid().await.unwrap());
		assert!(bound.is_valid().await.unwrap());
		assert_eq!(bound.status(), ValidationStatus::Valid);
		assert_eq!(bound.validated_data().unwrap().get("title"), Some(&json!("Hi")));
		assert_eq!(bound.errors().unwrap(), None);
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalid_state_exposes_error_document(serializer: ResourceSerializer) {
		let mut bound = serializer.bind(json!({"data": {"type": "post", "attributes": {"title": "Hi"}}}));
		assert!(!bound.is_valid().await.unwrap());
		assert_eq!(bound.status(), ValidationStatus::Invalid);
		assert!(matches!(bound.validated_data(), Err(SerializerError::Usage(_))));
		let document = bound.errors().unwrap().unwrap();
		assert_eq!(document.errors.len(), 1);
		assert_eq!(
			document.errors[0].detail,
			"The JSON field \"type\" caused an exception: \"post\" is not a correct object type."
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_partial_binding(serializer: ResourceSerializer) {
		let mut bound = serializer.bind_partial(json!({"data": {"type": "article"}}));
		assert!(bound.is_valid().await.unwrap());
		assert!(bound.validated_data().unwrap().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_bound_list(serializer: ResourceSerializer) {
		let mut bound = serializer.bind_many(json!({"data": [
			{"type": "article", "attributes": {"title": "One"}},
			{"type": "article", "attributes": {"title": "Two"}},
		]}));
		assert!(bound.is_valid().await.unwrap());
		assert_eq!(bound.validated_data().unwrap().len(), 2);
	}
}
