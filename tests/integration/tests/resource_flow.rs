//! End-to-end flows across the serializer, filter and viewset layers

use http::{Method, StatusCode};
use reinhardt_jsonapi::{Identifier, RecordStore};
use reinhardt_jsonapi_integration_tests::{
	HOST, data_keys, included_keys, included_viewset, request, viewset,
};
use reinhardt_jsonapi_test::{FixtureStores, populated_stores, test_document};
use rstest::rstest;
use serde_json::json;

fn local_target(location: &str) -> &str {
	location
		.strip_prefix("http://")
		.and_then(|rest| rest.strip_prefix(HOST))
		.unwrap()
}

#[rstest]
#[tokio::test]
async fn test_created_record_is_listed_and_filterable(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let created = viewset
		.dispatch(&request(Method::POST, "/test/").with_body(test_document(None)))
		.await;
	assert_eq!(created.status, StatusCode::CREATED);
	let location = created.location.clone().unwrap();

	let fetched = viewset
		.dispatch(&request(Method::GET, local_target(&location)))
		.await;
	assert_eq!(fetched.status, StatusCode::OK);
	assert_eq!(fetched.body["data"], created.body["data"]);

	let same_int = viewset
		.dispatch(&request(Method::GET, "/test/?filter[int]=10"))
		.await;
	assert_eq!(
		data_keys(&same_int),
		vec![("test".to_string(), 1), ("test".to_string(), 4)]
	);
	assert_eq!(same_int.body["meta"]["count"], 2);
	assert_eq!(
		included_keys(&same_int),
		vec![
			("test-included".to_string(), 1),
			("test-included".to_string(), 2)
		]
	);

	let larger = viewset
		.dispatch(&request(Method::GET, "/test/?filter[int__gte]=20"))
		.await;
	assert_eq!(
		data_keys(&larger),
		vec![("test".to_string(), 2), ("test".to_string(), 3)]
	);
}

#[rstest]
#[tokio::test]
async fn test_replaced_relationship_is_followed(populated_stores: FixtureStores) {
	let tests = viewset(&populated_stores);
	let included = included_viewset(&populated_stores);

	let replaced = tests
		.dispatch(
			&request(Method::PUT, "/test/3/relationships/foreign_key/")
				.with_body(json!({"data": {"type": "test-included", "id": 2}})),
		)
		.await;
	assert_eq!(replaced.status, StatusCode::OK);
	assert_eq!(
		replaced.body,
		json!({"data": {"type": "test-included", "id": 2}})
	);

	let redirect = tests
		.dispatch(&request(Method::GET, "/test/3/foreign_key/"))
		.await;
	assert_eq!(redirect.status, StatusCode::FOUND);
	let location = redirect.location.unwrap();
	assert_eq!(location, "http://testserver/test-included/2/");

	let target = included
		.dispatch(&request(Method::GET, local_target(&location)))
		.await;
	assert_eq!(target.status, StatusCode::OK);
	assert_eq!(target.body["data"]["type"], "test-included");
	assert_eq!(target.body["data"]["id"], 2);
	let mut related = included_keys(&target);
	related.sort();
	assert_eq!(
		related,
		vec![
			("test-included-relation".to_string(), 1),
			("test-included-relation".to_string(), 2)
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_to_many_redirect_lists_members(populated_stores: FixtureStores) {
	let redirect = viewset(&populated_stores)
		.dispatch(&request(Method::GET, "/test/1/many_to_many/"))
		.await;
	let location = redirect.location.unwrap();

	let members = included_viewset(&populated_stores)
		.dispatch(&request(Method::GET, local_target(&location)))
		.await;
	assert_eq!(members.status, StatusCode::OK);
	assert_eq!(
		data_keys(&members),
		vec![
			("test-included".to_string(), 1),
			("test-included".to_string(), 2)
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_partial_update_keeps_relationships(populated_stores: FixtureStores) {
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::PATCH, "/test/2/").with_body(json!({"data": {
			"type": "test",
			"id": 2,
			"attributes": {"choice_str": "UK"},
		}})))
		.await;
	assert_eq!(response.status, StatusCode::OK);

	let record = populated_stores
		.test
		.get(&Identifier::Int(2))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(record.attribute("choice_str").await.unwrap(), json!("UK"));
	let related = record.related_many("many_to_many").await.unwrap();
	assert_eq!(
		related.iter().map(|record| record.id()).collect::<Vec<_>>(),
		vec![Identifier::Int(1)]
	);
}

#[rstest]
#[tokio::test]
async fn test_mounted_viewset(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores).mount("/api");
	assert_eq!(viewset.collection_path(), "/api/test/");

	let response = viewset.dispatch(&request(Method::GET, "/api/test/1/")).await;
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(
		response.body["data"]["links"]["self"],
		"http://testserver/api/test/1/"
	);

	let outside = viewset.dispatch(&request(Method::GET, "/test/1/")).await;
	assert_eq!(outside.status, StatusCode::NOT_FOUND);
}
