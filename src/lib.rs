//! # Reinhardt JSON:API
//!
//! JSON:API support for Reinhardt: records are rendered as resource objects
//! with a deduplicated `included` section, and request documents are
//! validated with every field error collected into one JSON:API error
//! document.
//!
//! ## Feature Flags
//!
//! - `serializers` - Field registry, representation builder, validation
//!   pipeline, error formatter and relationship resolver
//! - `filters` - `filter[...]` parameters and `page[limit]`/`page[offset]`
//!   pagination
//! - `viewsets` - Transport-agnostic list/retrieve/create/update and
//!   relationship handlers
//! - `full` (default) - All of the above
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use reinhardt_jsonapi::{FieldDescriptor, ResourceDefinition, ResourceSerializer};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let definition = ResourceDefinition::builder("ArticleSerializer")
//!     .resource_type("article")
//!     .field("title", FieldDescriptor::char().max_length(64))
//!     .build()?;
//! let serializer = ResourceSerializer::new(Arc::new(definition));
//!
//! let mut bound = serializer.bind(json!({
//!     "data": {"type": "article", "attributes": {"title": "Hello"}}
//! }));
//! if !bound.is_valid().await? {
//!     println!("{}", serde_json::to_string(&bound.errors()?)?);
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "filters")]
pub mod filters;
#[cfg(feature = "serializers")]
pub mod serializers;
#[cfg(feature = "viewsets")]
pub mod viewsets;

#[cfg(feature = "serializers")]
pub use reinhardt_jsonapi_serializers::{
	BoundListSerializer, BoundSerializer, ConfigurationError, Document, ErrorDocument,
	ErrorFormatter, FieldDescriptor, FieldError, FieldKind, Identifier, JsonApiSettings,
	Linkage, ModelSchema, Record, RecordStore, RelationshipResolver, RepresentationBuilder,
	ResourceDefinition, ResourceIdentifier, ResourceSerializer, SerializationContext,
	SerializerError, SerializerResult, ValidationPipeline,
};

#[cfg(feature = "filters")]
pub use reinhardt_jsonapi_filters::{FilterError, JsonApiFilter, LimitOffsetPagination};

#[cfg(feature = "viewsets")]
pub use reinhardt_jsonapi_viewsets::{ApiRequest, ApiResponse, JsonApiViewSet, ViewSetError};
