use http::{Method, StatusCode};
use reinhardt_jsonapi_serializers::{Identifier, JsonApiSettings, RecordStore};
use reinhardt_jsonapi_test::{FixtureStores, populated_stores, test_definition, test_document};
use reinhardt_jsonapi_viewsets::{ApiRequest, JsonApiViewSet};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

fn viewset(stores: &FixtureStores) -> JsonApiViewSet {
	JsonApiViewSet::new(test_definition(), Arc::new(stores.test.clone()))
}

fn request(method: Method, target: &str) -> ApiRequest {
	ApiRequest::new(method, "testserver", target).unwrap()
}

fn ids(body: &Value) -> Vec<i64> {
	body["data"]
		.as_array()
		.unwrap()
		.iter()
		.map(|item| item["id"].as_i64().unwrap())
		.collect()
}

#[rstest]
#[tokio::test]
async fn test_list_deduplicates_included(populated_stores: FixtureStores) {
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::GET, "/test/"))
		.await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(ids(&response.body), vec![1, 2, 3]);
	assert_eq!(response.body["meta"], json!({"count": 3}));
	let included: Vec<(String, i64)> = response.body["included"]
		.as_array()
		.unwrap()
		.iter()
		.map(|item| {
			(
				item["type"].as_str().unwrap().to_string(),
				item["id"].as_i64().unwrap(),
			)
		})
		.collect();
	assert_eq!(
		included,
		vec![
			("test-included".to_string(), 1),
			("test-included".to_string(), 2)
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_list_filters_and_paginates(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let filtered = viewset
		.dispatch(&request(Method::GET, "/test/?filter[id]=1,3"))
		.await;
	assert_eq!(ids(&filtered.body), vec![1, 3]);
	assert_eq!(filtered.body["meta"]["count"], 2);

	let page = viewset
		.dispatch(&request(Method::GET, "/test/?page[limit]=1&page[offset]=1"))
		.await;
	assert_eq!(ids(&page.body), vec![2]);
	assert!(page.body["links"]["prev"].is_string());
	assert!(page.body["links"]["next"].is_string());

	let by_relation = viewset
		.dispatch(&request(Method::GET, "/test/?filter[many_to_many]=2"))
		.await;
	assert_eq!(ids(&by_relation.body), vec![1]);
}

#[rstest]
#[tokio::test]
async fn test_list_with_huge_limit(populated_stores: FixtureStores) {
	let target = format!("/test/?page[limit]={}&page[offset]=1", usize::MAX);
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::GET, &target))
		.await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(ids(&response.body), vec![2, 3]);
	assert!(response.body["links"]["next"].is_null());
	assert!(response.body["links"]["prev"].is_string());
}

#[rstest]
#[tokio::test]
async fn test_empty_list(populated_stores: FixtureStores) {
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::GET, "/test/?filter[id]=99"))
		.await;
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body, json!({"data": []}));
}

#[rstest]
#[tokio::test]
async fn test_retrieve(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let response = viewset.dispatch(&request(Method::GET, "/test/1/")).await;
	assert_eq!(response.status, StatusCode::OK);
	let data = &response.body["data"];
	assert_eq!(data["type"], "test");
	assert_eq!(data["id"], 1);
	assert_eq!(data["links"]["self"], "http://testserver/test/1/");
	assert_eq!(data["attributes"]["text"], "text 1");
	assert_eq!(
		data["relationships"]["foreign_key"],
		json!({
			"data": {"type": "test-included", "id": 1},
			"links": {
				"self": "http://testserver/test/1/relationships/foreign_key/",
				"related": "http://testserver/test/1/foreign_key/",
			},
		})
	);

	let missing = viewset.dispatch(&request(Method::GET, "/test/99/")).await;
	assert_eq!(missing.status, StatusCode::NOT_FOUND);
	assert_eq!(missing.body, json!({"data": null}));
}

#[rstest]
#[tokio::test]
async fn test_create(populated_stores: FixtureStores) {
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::POST, "/test/").with_body(test_document(None)))
		.await;

	assert_eq!(response.status, StatusCode::CREATED);
	assert_eq!(response.location.as_deref(), Some("http://testserver/test/4/"));
	assert_eq!(response.body["data"]["id"], 4);
	assert_eq!(populated_stores.test.len(), 4);
}

#[rstest]
#[tokio::test]
async fn test_create_many(populated_stores: FixtureStores) {
	let first = test_document(None)["data"].clone();
	let body = json!({"data": [first.clone(), first]});
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::POST, "/test/").with_body(body))
		.await;

	assert_eq!(response.status, StatusCode::CREATED);
	assert_eq!(ids(&response.body), vec![4, 5]);
}

#[rstest]
#[tokio::test]
async fn test_create_invalid_uses_error_code(populated_stores: FixtureStores) {
	let mut body = test_document(None);
	body["data"]["type"] = json!("wrong");
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::POST, "/test/").with_body(body))
		.await;

	assert_eq!(response.status, StatusCode::FORBIDDEN);
	assert_eq!(
		response.body,
		json!({
			"jsonapi": {"version": "1.1"},
			"errors": [{
				"code": 403,
				"detail": "The JSON field \"type\" caused an exception: \"wrong\" is not a correct object type.",
				"source": {"pointer": "http://testserver/test/"},
			}],
		})
	);
	assert_eq!(populated_stores.test.len(), 3);
}

#[rstest]
#[tokio::test]
async fn test_error_code_follows_settings(populated_stores: FixtureStores) {
	let settings = JsonApiSettings {
		error_code: 422,
		..Default::default()
	};
	let response = viewset(&populated_stores)
		.with_settings(Arc::new(settings))
		.dispatch(&request(Method::POST, "/test/").with_body(json!({"data": {}})))
		.await;
	assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(response.body["errors"][0]["code"], 422);
}

#[rstest]
#[tokio::test]
async fn test_partial_update(populated_stores: FixtureStores) {
	let body = json!({"data": {"type": "test", "id": 1, "attributes": {"int": 99}}});
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::PATCH, "/test/1/").with_body(body))
		.await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body["data"]["attributes"]["int"], 99);
	assert_eq!(response.body["data"]["attributes"]["text"], "text 1");
}

#[rstest]
#[tokio::test]
async fn test_full_update(populated_stores: FixtureStores) {
	let mut body = test_document(Some(Identifier::Int(2)));
	body["data"]["attributes"]["text"] = json!("replaced");
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::PUT, "/test/2/").with_body(body))
		.await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body["data"]["attributes"]["text"], "replaced");
	assert_eq!(response.body["data"]["links"]["self"], "http://testserver/test/2/");
}

#[rstest]
#[tokio::test]
async fn test_relationship_linkage(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let many = viewset
		.dispatch(&request(Method::GET, "/test/1/relationships/many_to_many/"))
		.await;
	assert_eq!(
		many.body,
		json!({"data": [
			{"type": "test-included", "id": 1, "links": {"self": "http://testserver/test-included/1/"}},
			{"type": "test-included", "id": 2, "links": {"self": "http://testserver/test-included/2/"}},
		]})
	);

	let none = viewset
		.dispatch(&request(Method::GET, "/test/3/relationships/foreign_key/"))
		.await;
	assert_eq!(none.status, StatusCode::OK);
	assert_eq!(none.body, json!({"data": null}));
}

#[rstest]
#[tokio::test]
async fn test_replace_relationship(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let body = json!({"data": [{"type": "test-included", "id": 2}]});
	let response = viewset
		.dispatch(&request(Method::PUT, "/test/3/relationships/many_to_many/").with_body(body))
		.await;
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body, json!({"data": [{"type": "test-included", "id": 2}]}));

	let record = populated_stores
		.test
		.get(&Identifier::Int(3))
		.await
		.unwrap()
		.unwrap();
	let related = record.related_many("many_to_many").await.unwrap();
	assert_eq!(related.len(), 1);
	assert_eq!(related[0].id(), Identifier::Int(2));

	let wrong = json!({"data": [{"type": "test", "id": 2}]});
	let rejected = viewset
		.dispatch(&request(Method::PUT, "/test/3/relationships/many_to_many/").with_body(wrong))
		.await;
	assert_eq!(rejected.status, StatusCode::FORBIDDEN);
	assert_eq!(
		rejected.body["errors"][0]["detail"],
		"The JSON field \"many_to_many.type\" caused an exception: \"test\" is not a correct object type."
	);
}

#[rstest]
#[tokio::test]
async fn test_related_redirects(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let single = viewset
		.dispatch(&request(Method::GET, "/test/1/foreign_key/"))
		.await;
	assert_eq!(single.status, StatusCode::FOUND);
	assert_eq!(
		single.location.as_deref(),
		Some("http://testserver/test-included/1/")
	);

	let many = viewset
		.dispatch(&request(Method::GET, "/test/1/many_to_many/"))
		.await;
	assert_eq!(many.status, StatusCode::FOUND);
	assert_eq!(
		many.location.as_deref(),
		Some("http://testserver/test-included/?filter[id]=1,2")
	);

	let empty = viewset
		.dispatch(&request(Method::GET, "/test/3/many_to_many/"))
		.await;
	assert_eq!(empty.status, StatusCode::NOT_FOUND);
	assert_eq!(empty.body, json!({"data": []}));
}

#[rstest]
#[tokio::test]
async fn test_routing_errors(populated_stores: FixtureStores) {
	let viewset = viewset(&populated_stores);

	let unknown = viewset
		.dispatch(&request(Method::GET, "/test/1/relationships/text/"))
		.await;
	assert_eq!(unknown.status, StatusCode::NOT_FOUND);
	assert_eq!(unknown.body["errors"][0]["code"], 404);

	let method = viewset.dispatch(&request(Method::DELETE, "/test/1/")).await;
	assert_eq!(method.status, StatusCode::METHOD_NOT_ALLOWED);

	let bad_filter = viewset
		.dispatch(&request(Method::GET, "/test/?filter[int__near]=1"))
		.await;
	assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn test_unloaded_relationship_is_reported(populated_stores: FixtureStores) {
	populated_stores.test.defer("foreign_key");
	let response = viewset(&populated_stores)
		.dispatch(&request(Method::GET, "/test/1/"))
		.await;
	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(
		response.body["errors"][0]["detail"]
			.as_str()
			.unwrap()
			.contains("foreign_key")
	);
}
