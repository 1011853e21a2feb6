//! Limit/offset pagination
//!
//! Reads the window from `page[limit]` and `page[offset]` (plain `limit` and
//! `offset` are accepted too) and decorates collection documents with
//! `first`/`prev`/`next`/`last` links and a `meta.count`.

use crate::filter::{FilterError, FilterResult};
use reinhardt_jsonapi_serializers::{Document, JsonApiSettings};
use serde_json::json;
use std::collections::HashMap;

/// The window selected by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
	pub limit: usize,
	pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationLinks {
	pub first: String,
	pub prev: Option<String>,
	pub next: Option<String>,
	pub last: String,
}

#[derive(Debug, Clone)]
pub struct LimitOffsetPagination {
	pub default_limit: usize,
	pub max_limit: Option<usize>,
	pub limit_query_param: String,
	pub offset_query_param: String,
}

impl Default for LimitOffsetPagination {
	fn default() -> Self {
		Self::new()
	}
}

impl LimitOffsetPagination {
	pub fn new() -> Self {
		Self {
			default_limit: 100,
			max_limit: None,
			limit_query_param: "page[limit]".to_string(),
			offset_query_param: "page[offset]".to_string(),
		}
	}

	pub fn from_settings(settings: &JsonApiSettings) -> Self {
		Self {
			default_limit: settings.default_page_limit,
			max_limit: settings.max_page_limit,
			..Self::new()
		}
	}

	pub fn default_limit(mut self, limit: usize) -> Self {
		self.default_limit = limit;
		self
	}

	pub fn max_limit(mut self, max: usize) -> Self {
		self.max_limit = Some(max);
		self
	}

	fn param<'a>(
		&self,
		query_params: &'a HashMap<String, String>,
		name: &str,
		fallback: &str,
	) -> Option<&'a String> {
		query_params.get(name).or_else(|| query_params.get(fallback))
	}

	/// Reads the requested window.
	///
	/// A missing or zero limit falls back to the default; any limit is
	/// clamped to `max_limit`.
	pub fn parse(&self, query_params: &HashMap<String, String>) -> FilterResult<PageRequest> {
		let limit = match self.param(query_params, &self.limit_query_param, "limit") {
			Some(raw) => raw
				.parse::<usize>()
				.map_err(|_| FilterError::InvalidParameter(format!("limit={}", raw)))?,
			None => self.default_limit,
		};
		let limit = if limit == 0 { self.default_limit } else { limit };
		let limit = match self.max_limit {
			Some(max) => limit.min(max),
			None => limit,
		};
		let offset = match self.param(query_params, &self.offset_query_param, "offset") {
			Some(raw) => raw
				.parse::<usize>()
				.map_err(|_| FilterError::InvalidParameter(format!("offset={}", raw)))?,
			None => 0,
		};
		Ok(PageRequest { limit, offset })
	}

	pub fn links(
		&self,
		base_url: &str,
		page: PageRequest,
		count: usize,
	) -> FilterResult<PaginationLinks> {
		let limit = page.limit.max(1);
		let last_offset = if count == 0 {
			0
		} else {
			((count - 1) / limit) * limit
		};
		let prev = if page.offset == 0 {
			None
		} else {
			Some(self.build_url(base_url, page.offset.saturating_sub(limit), limit)?)
		};
		let next = match page.offset.checked_add(limit) {
			Some(end) if end < count => Some(self.build_url(base_url, end, limit)?),
			_ => None,
		};
		Ok(PaginationLinks {
			first: self.build_url(base_url, 0, limit)?,
			prev,
			next,
			last: self.build_url(base_url, last_offset, limit)?,
		})
	}

	/// Adds pagination links and the total count to a collection document.
	pub fn decorate(
		&self,
		document: &mut Document,
		base_url: &str,
		page: PageRequest,
		count: usize,
	) -> FilterResult<()> {
		let links = self.links(base_url, page, count)?;
		document.links = Some(json!({
			"first": links.first,
			"prev": links.prev,
			"next": links.next,
			"last": links.last,
		}));
		document.meta = Some(json!({ "count": count }));
		Ok(())
	}

	fn build_url(&self, base_url: &str, offset: usize, limit: usize) -> FilterResult<String> {
		let url = url::Url::parse(base_url)
			.map_err(|e| FilterError::InvalidUrl(format!("{}: {}", base_url, e)))?;

		let mut new_url = url.clone();
		new_url
			.query_pairs_mut()
			.clear()
			.append_pair(&self.limit_query_param, &limit.to_string())
			.append_pair(&self.offset_query_param, &offset.to_string());

		// Copy other query parameters
		for (key, value) in url.query_pairs() {
			if key != self.offset_query_param
				&& key != self.limit_query_param
				&& key != "limit"
				&& key != "offset"
			{
				new_url.query_pairs_mut().append_pair(&key, &value);
			}
		}

		Ok(new_url.to_string())
	}
}
