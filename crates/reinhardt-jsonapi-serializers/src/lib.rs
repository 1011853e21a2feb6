//! # Reinhardt JSON:API Serializers
//!
//! Converts stored records into JSON:API documents and validates incoming
//! JSON:API documents.
//!
//! ## Overview
//!
//! - [`ResourceDefinition`]: declared and model-derived fields, grouped into
//!   identity, attributes and relationships
//! - [`ResourceSerializer`]: renders records as documents with a
//!   deduplicated `included` section
//! - [`BoundSerializer`]: validates request input once and caches the
//!   verdict, aggregating every field error
//! - [`ErrorFormatter`]: turns collected errors into a JSON:API error
//!   document
//! - [`RelationshipResolver`]: reads related objects and builds linkage
//!
//! Records and their storage are reached through the [`Record`] and
//! [`RecordStore`] traits, so the engine is independent of any database.
//!
//! ## Example
//!
//! ```
//! use reinhardt_jsonapi_serializers::{FieldDescriptor, ResourceDefinition, ResourceSerializer};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let definition = ResourceDefinition::builder("ArticleSerializer")
//!     .resource_type("article")
//!     .field("title", FieldDescriptor::char().max_length(16))
//!     .build()
//!     .unwrap();
//! let serializer = ResourceSerializer::new(Arc::new(definition));
//!
//! let mut bound = serializer.bind(json!({
//!     "data": {"type": "article", "attributes": {"title": "Hello"}}
//! }));
//! assert!(bound.is_valid().await.unwrap());
//! assert_eq!(bound.validated_data().unwrap().get("title"), Some(&json!("Hello")));
//! # });
//! ```

pub mod context;
pub mod document;
pub mod error;
pub mod error_format;
pub mod fields;
pub mod identifier;
pub mod registry;
pub mod relations;
pub mod representation;
pub mod serializer;
pub mod settings;
pub mod store;
pub mod validation;
pub mod validator;

pub use context::{PathReverser, RequestContext, SerializationContext, UrlReverser};
pub use document::{
	Document, IncludedSet, Linkage, PrimaryData, RelationshipLinks, RelationshipObject,
	ResourceLinks, ResourceObject,
};
pub use error::{ConfigurationError, SerializerError, SerializerResult};
pub use error_format::{ErrorDocument, ErrorFormatter, ErrorObject, ErrorSource, JsonApiObject};
pub use fields::{Cardinality, Choice, FieldDescriptor, FieldError, FieldKind};
pub use identifier::{Identifier, ResourceIdentifier, resource_type_for};
pub use registry::{FieldRegistry, FieldSelection, ResourceDefinition, ResourceDefinitionBuilder};
pub use relations::{RelationshipResolver, validate_linkage};
pub use representation::RepresentationBuilder;
pub use serializer::{BoundListSerializer, BoundSerializer, ResourceSerializer, ValidationStatus};
pub use settings::{JsonApiSettings, SettingsError};
pub use store::{
	ColumnInfo, ColumnKind, FilterPredicate, FilterValue, Lookup, ModelSchema, Record, RecordRef,
	RecordStore, StoreError, StoreQuery, StoreResult,
};
pub use validation::{ErrorCollection, ErrorEntry, ValidatedData, ValidationPipeline};
pub use validator::{FieldHook, FieldValidator};
