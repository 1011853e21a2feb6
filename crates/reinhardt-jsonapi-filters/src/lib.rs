//! # Reinhardt JSON:API Filters
//!
//! Query parameter handling for JSON:API collection endpoints:
//!
//! - [`JsonApiFilter`]: `filter[<field>__<lookup>]=<value>` parameters into
//!   store predicates
//! - [`LimitOffsetPagination`]: `page[limit]` / `page[offset]` windows and
//!   the matching `links` and `meta.count` members

pub mod filter;
pub mod pagination;

pub use filter::{FilterBackend, FilterError, FilterResult, JsonApiFilter};
pub use pagination::{LimitOffsetPagination, PageRequest, PaginationLinks};
