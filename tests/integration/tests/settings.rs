//! Settings loaded from files and overrides driving viewset behaviour

use http::{Method, StatusCode};
use reinhardt_jsonapi::JsonApiSettings;
use reinhardt_jsonapi_integration_tests::{configured_viewset, data_keys, request};
use reinhardt_jsonapi_test::{FixtureStores, populated_stores};
use rstest::rstest;
use serde_json::json;
use std::io::Write;

fn settings_file(content: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(content.as_bytes()).unwrap();
	file
}

#[rstest]
#[tokio::test]
async fn test_file_settings_drive_pagination_and_errors(populated_stores: FixtureStores) {
	let file = settings_file(
		r#"
error_code = 422
default_page_limit = 2
max_page_limit = 2
"#,
	);
	let settings = JsonApiSettings::from_file(file.path()).unwrap();
	assert_eq!(settings.version, "1.1");
	let viewset = configured_viewset(&populated_stores, settings);

	let first_page = viewset.dispatch(&request(Method::GET, "/test/")).await;
	assert_eq!(data_keys(&first_page).len(), 2);
	assert_eq!(first_page.body["meta"]["count"], 3);
	assert!(first_page.body["links"]["next"].is_string());

	let clamped = viewset
		.dispatch(&request(Method::GET, "/test/?page[limit]=10&page[offset]=2"))
		.await;
	assert_eq!(data_keys(&clamped), vec![("test".to_string(), 3)]);
	assert!(clamped.body["links"]["next"].is_null());

	let invalid = viewset
		.dispatch(&request(Method::POST, "/test/").with_body(json!({"data": {}})))
		.await;
	assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(invalid.body["errors"][0]["code"], 422);
}

#[rstest]
#[tokio::test]
async fn test_overrides_disable_included(populated_stores: FixtureStores) {
	let vars = [
		("APP_INCLUDE_RELATED".to_string(), "off".to_string()),
		("APP_VERSION".to_string(), "1.0".to_string()),
	];
	let settings = JsonApiSettings::default()
		.with_overrides(vars, "APP_")
		.unwrap();
	let viewset = configured_viewset(&populated_stores, settings);

	let response = viewset.dispatch(&request(Method::GET, "/test/1/")).await;
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body["included"], json!([]));

	let invalid = viewset
		.dispatch(&request(Method::POST, "/test/").with_body(json!({"data": {}})))
		.await;
	assert_eq!(invalid.body["jsonapi"]["version"], "1.0");
}

#[rstest]
fn test_malformed_file_is_rejected() {
	let file = settings_file("error_code = \"teapot\"");
	assert!(JsonApiSettings::from_file(file.path()).is_err());
}
