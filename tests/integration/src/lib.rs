//! Shared helpers for the end-to-end JSON:API tests
//!
//! The fixtures themselves live in `reinhardt-jsonapi-test`; this crate adds
//! request builders and a customised serializer used by several flows.

use http::Method;
use reinhardt_jsonapi::serializers::validator::{MinLengthValidator, sync_hook};
use reinhardt_jsonapi::{
	ApiRequest, ApiResponse, JsonApiSettings, JsonApiViewSet, ResourceDefinition,
};
use reinhardt_jsonapi_test::{FixtureStores, test_definition};
use serde_json::Value;
use std::sync::Arc;

pub const HOST: &str = "testserver";

pub fn request(method: Method, target: &str) -> ApiRequest {
	ApiRequest::new(method, HOST, target).unwrap()
}

pub fn viewset(stores: &FixtureStores) -> JsonApiViewSet {
	JsonApiViewSet::new(test_definition(), Arc::new(stores.test.clone()))
}

pub fn included_viewset(stores: &FixtureStores) -> JsonApiViewSet {
	JsonApiViewSet::new(
		reinhardt_jsonapi_test::test_included_definition(),
		Arc::new(stores.test_included.clone()),
	)
}

pub fn configured_viewset(stores: &FixtureStores, settings: JsonApiSettings) -> JsonApiViewSet {
	viewset(stores).with_settings(Arc::new(settings))
}

/// Fixture serializer that upper-cases `text` and requires it to be at
/// least three characters long in the raw document.
pub fn shouting_definition() -> Arc<ResourceDefinition> {
	let definition = ResourceDefinition::builder("ShoutingTestSerializer")
		.inherit(&test_definition())
		.hook(
			"text",
			sync_hook(|value: Value| {
				Ok(Value::String(
					value.as_str().unwrap_or_default().to_uppercase(),
				))
			}),
		)
		.document_validator("attributes.text", Arc::new(MinLengthValidator::new(3)))
		.build()
		.unwrap();
	Arc::new(definition)
}

/// `(type, id)` pairs of a response's primary data.
pub fn data_keys(response: &ApiResponse) -> Vec<(String, i64)> {
	keys(&response.body["data"])
}

pub fn included_keys(response: &ApiResponse) -> Vec<(String, i64)> {
	keys(&response.body["included"])
}

fn keys(items: &Value) -> Vec<(String, i64)> {
	items
		.as_array()
		.map(|items| {
			items
				.iter()
				.map(|item| {
					(
						item["type"].as_str().unwrap_or_default().to_string(),
						item["id"].as_i64().unwrap_or_default(),
					)
				})
				.collect()
		})
		.unwrap_or_default()
}
