//! `filter[...]` query parameters
//!
//! A query parameter of the form `filter[<field>]` or
//! `filter[<field>__<lookup>]` becomes one [`FilterPredicate`]. The lookup
//! defaults to `in`, so `filter[id]=1,2` selects both records.

use async_trait::async_trait;
use reinhardt_jsonapi_serializers::{
	FilterPredicate, FilterValue, Lookup, ModelSchema, StoreQuery,
};
use std::collections::HashMap;
use thiserror::Error;

const FILTER_PREFIX: &str = "filter[";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
	#[error("Invalid filter parameter: {0}")]
	InvalidParameter(String),

	#[error("Unknown lookup `{lookup}` for field `{field}`")]
	UnknownLookup { field: String, lookup: String },

	#[error("Range filter on `{field}` needs exactly two bounds, got `{value}`")]
	InvalidRange { field: String, value: String },

	#[error("Invalid URL: {0}")]
	InvalidUrl(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

/// Turns request query parameters into store filters.
#[async_trait]
pub trait FilterBackend: Send + Sync {
	async fn filter_query(
		&self,
		query_params: &HashMap<String, String>,
		schema: &ModelSchema,
		query: StoreQuery,
	) -> FilterResult<StoreQuery>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiFilter;

impl JsonApiFilter {
	pub fn new() -> Self {
		Self
	}

	/// Translates every `filter[...]` parameter into a predicate.
	///
	/// Parameters naming a field the model does not have are skipped.
	/// Predicates come out sorted by parameter name.
	pub fn predicates(
		query_params: &HashMap<String, String>,
		schema: &ModelSchema,
	) -> FilterResult<Vec<FilterPredicate>> {
		let mut keys: Vec<&String> = query_params
			.keys()
			.filter(|key| key.starts_with(FILTER_PREFIX))
			.collect();
		keys.sort();

		let mut predicates = Vec::with_capacity(keys.len());
		for key in keys {
			let inner = key
				.rsplit('[')
				.next()
				.unwrap_or_default()
				.replace(']', "");
			let mut parts = inner.split("__");
			let field = parts.next().unwrap_or_default();
			let lookup = match parts.next() {
				None => Lookup::In,
				Some(name) => Lookup::parse(name).ok_or_else(|| FilterError::UnknownLookup {
					field: field.to_string(),
					lookup: name.to_string(),
				})?,
			};

			let Some(column) = schema.get(field) else {
				tracing::warn!(
					"Skipping filter `{}`: `{}` has no field `{}`",
					key,
					schema.name(),
					field
				);
				continue;
			};

			let raw = &query_params[key];
			let value = coerce(field, lookup, raw)?;
			let mut predicate = FilterPredicate::new(field, lookup, value);
			if column.kind.is_relation() {
				predicate = predicate.through_relation();
			}
			tracing::debug!("filter {} = {:?}", predicate.path(), predicate.value);
			predicates.push(predicate);
		}
		Ok(predicates)
	}
}

fn coerce(field: &str, lookup: Lookup, raw: &str) -> FilterResult<FilterValue> {
	if !raw.contains(',') && lookup != Lookup::In && is_numeric(raw) {
		return raw
			.parse::<i64>()
			.map(FilterValue::Int)
			.map_err(|_| FilterError::InvalidParameter(format!("{}={}", field, raw)));
	}
	match lookup {
		Lookup::Range => {
			let bounds: Vec<&str> = raw.split(',').collect();
			match bounds.as_slice() {
				[low, high] => Ok(FilterValue::Range(low.to_string(), high.to_string())),
				_ => Err(FilterError::InvalidRange {
					field: field.to_string(),
					value: raw.to_string(),
				}),
			}
		}
		Lookup::IsNull => match raw.to_ascii_lowercase().as_str() {
			"true" => Ok(FilterValue::Bool(true)),
			"false" => Ok(FilterValue::Bool(false)),
			_ => Err(FilterError::InvalidParameter(format!("{}={}", field, raw))),
		},
		_ => Ok(FilterValue::List(
			raw.split(',')
				.filter(|item| !item.is_empty())
				.map(str::to_string)
				.collect(),
		)),
	}
}

fn is_numeric(raw: &str) -> bool {
	!raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}

#[async_trait]
impl FilterBackend for JsonApiFilter {
	async fn filter_query(
		&self,
		query_params: &HashMap<String, String>,
		schema: &ModelSchema,
		query: StoreQuery,
	) -> FilterResult<StoreQuery> {
		Ok(query.filters(Self::predicates(query_params, schema)?))
	}
}
