//! Serializers module.
//!
//! Field registry, representation, validation and error formatting.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reinhardt_jsonapi::serializers::{FieldDescriptor, ResourceDefinition};
//!
//! let definition = ResourceDefinition::builder("ArticleSerializer")
//!     .resource_type("article")
//!     .field("title", FieldDescriptor::char().max_length(64))
//!     .build();
//! ```

pub use reinhardt_jsonapi_serializers::*;
