//! Serializers with declared fields, hooks and document validators

use http::{Method, StatusCode};
use reinhardt_jsonapi::serializers::Choice;
use reinhardt_jsonapi::{
	FieldDescriptor, JsonApiViewSet, Linkage, ResourceDefinition, ResourceIdentifier,
	ResourceSerializer,
};
use reinhardt_jsonapi_integration_tests::{request, shouting_definition};
use reinhardt_jsonapi_test::{FixtureStores, populated_stores, test_document};
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::Arc;

#[fixture]
fn article_serializer() -> ResourceSerializer {
	let definition = ResourceDefinition::builder("ArticleSerializer")
		.resource_type("article")
		.field("title", FieldDescriptor::char().max_length(16))
		.field(
			"status",
			FieldDescriptor::choice([Choice::new("draft", "Draft"), Choice::new("live", "Live")]),
		)
		.field(
			"tags",
			FieldDescriptor::multi_relation().related_type("tag").optional(),
		)
		.build()
		.unwrap();
	ResourceSerializer::new(Arc::new(definition))
}

#[rstest]
#[tokio::test]
async fn test_declared_fields_validate(article_serializer: ResourceSerializer) {
	let mut bound = article_serializer.bind(json!({"data": {
		"type": "article",
		"attributes": {"title": "Hello", "status": "live"},
		"relationships": {"tags": {"data": [{"type": "tag", "id": 3}]}},
	}}));
	assert!(bound.is_valid().await.unwrap());

	let data = bound.validated_data().unwrap();
	assert_eq!(data.get("status"), Some(&json!("live")));
	assert_eq!(
		data.relationship("tags"),
		Some(&Linkage::Many(vec![ResourceIdentifier::new("tag", 3)]))
	);
}

#[rstest]
#[tokio::test]
async fn test_declared_fields_report_every_error(article_serializer: ResourceSerializer) {
	let mut bound = article_serializer.bind(json!({"data": {
		"type": "post",
		"attributes": {"title": "A title that is far too long", "status": "gone"},
	}}));
	assert!(!bound.is_valid().await.unwrap());

	let document = serde_json::to_value(bound.errors().unwrap()).unwrap();
	let details: Vec<&str> = document["errors"]
		.as_array()
		.unwrap()
		.iter()
		.map(|error| error["detail"].as_str().unwrap())
		.collect();
	assert_eq!(
		details,
		vec![
			"The JSON field \"type\" caused an exception: \"post\" is not a correct object type.",
			"The JSON field \"title\" caused an exception: ensure this field has no more than 16 characters.",
			"The JSON field \"status\" caused an exception: \"gone\" is not a valid choice.",
		]
	);
	assert!(document["errors"][0].get("source").is_none());
}

#[rstest]
#[tokio::test]
async fn test_hook_rewrites_stored_value(populated_stores: FixtureStores) {
	let viewset = JsonApiViewSet::new(shouting_definition(), Arc::new(populated_stores.test.clone()));
	let response = viewset
		.dispatch(&request(Method::POST, "/test/").with_body(test_document(None)))
		.await;

	assert_eq!(response.status, StatusCode::CREATED);
	assert_eq!(response.body["data"]["type"], "test");
	assert_eq!(response.body["data"]["attributes"]["text"], "TEXT 1");
}

#[rstest]
#[tokio::test]
async fn test_document_validator_rejects_raw_input(populated_stores: FixtureStores) {
	let viewset = JsonApiViewSet::new(shouting_definition(), Arc::new(populated_stores.test.clone()));
	let mut body = test_document(None);
	body["data"]["attributes"]["text"] = json!("ab");
	let response = viewset
		.dispatch(&request(Method::POST, "/test/").with_body(body))
		.await;

	assert_eq!(response.status, StatusCode::FORBIDDEN);
	assert_eq!(
		response.body,
		json!({
			"jsonapi": {"version": "1.1"},
			"errors": [{
				"code": 403,
				"detail": "The JSON field \"attributes.text\" caused an exception: ensure this value has at least 3 characters (it has 2).",
				"source": {"pointer": "http://testserver/test/"},
			}],
		})
	);
	assert_eq!(populated_stores.test.len(), 3);
}
