//! Filters module.
//!
//! `filter[...]` query translation and limit/offset pagination.

pub use reinhardt_jsonapi_filters::*;
