//! Framework-neutral request and response values

use crate::error::{ViewSetError, ViewSetResult};
use http::{Method, StatusCode};
use reinhardt_jsonapi_serializers::RequestContext;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ApiRequest {
	pub method: Method,
	pub scheme: String,
	pub host: String,
	pub path: String,
	pub query: HashMap<String, String>,
	pub body: Value,
	raw_query: Option<String>,
}

impl ApiRequest {
	/// Builds a request for `target`, a path with an optional query string.
	pub fn new(method: Method, host: impl Into<String>, target: &str) -> ViewSetResult<Self> {
		let (path, raw_query) = match target.split_once('?') {
			Some((path, query)) => (path, Some(query.to_string())),
			None => (target, None),
		};
		let query = match &raw_query {
			Some(raw) => serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
				.map_err(|e| ViewSetError::BadRequest(format!("invalid query string: {}", e)))?
				.into_iter()
				.collect(),
			None => HashMap::new(),
		};
		Ok(Self {
			method,
			scheme: "http".to_string(),
			host: host.into(),
			path: path.to_string(),
			query,
			body: Value::Null,
			raw_query,
		})
	}

	pub fn get(host: impl Into<String>, target: &str) -> ViewSetResult<Self> {
		Self::new(Method::GET, host, target)
	}

	pub fn with_body(mut self, body: Value) -> Self {
		self.body = body;
		self
	}

	pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.scheme = scheme.into();
		self
	}

	/// Absolute URL including the query string.
	pub fn url(&self) -> String {
		match &self.raw_query {
			Some(query) => format!("{}://{}{}?{}", self.scheme, self.host, self.path, query),
			None => format!("{}://{}{}", self.scheme, self.host, self.path),
		}
	}

	pub fn context(&self) -> RequestContext {
		RequestContext::new(self.host.clone(), self.path.clone()).with_scheme(self.scheme.clone())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
	pub status: StatusCode,
	pub body: Value,
	pub location: Option<String>,
}

impl ApiResponse {
	pub fn new(status: StatusCode, body: Value) -> Self {
		Self {
			status,
			body,
			location: None,
		}
	}

	pub fn ok(body: Value) -> Self {
		Self::new(StatusCode::OK, body)
	}

	pub fn created(body: Value) -> Self {
		Self::new(StatusCode::CREATED, body)
	}

	pub fn not_found(body: Value) -> Self {
		Self::new(StatusCode::NOT_FOUND, body)
	}

	pub fn redirect(location: impl Into<String>) -> Self {
		Self {
			status: StatusCode::FOUND,
			body: Value::Null,
			location: Some(location.into()),
		}
	}

	pub fn with_location(mut self, location: impl Into<String>) -> Self {
		self.location = Some(location.into());
		self
	}
}
