//! Conversion of collected validation errors into a JSON:API error document.

use crate::settings::JsonApiSettings;
use crate::validation::{ErrorCollection, ErrorEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
	pub pointer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
	pub code: u16,
	pub detail: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<ErrorSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiObject {
	pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
	pub jsonapi: JsonApiObject,
	pub errors: Vec<ErrorObject>,
}

pub struct ErrorFormatter<'a> {
	settings: &'a JsonApiSettings,
	source: Option<&'a str>,
}

impl<'a> ErrorFormatter<'a> {
	pub fn new(settings: &'a JsonApiSettings) -> Self {
		Self {
			settings,
			source: None,
		}
	}

	/// Sets the URL reported as `source.pointer` of every error.
	pub fn with_source(mut self, source: Option<&'a str>) -> Self {
		self.source = source;
		self
	}

	/// Builds one error object per key, from the first message recorded
	/// under it. Returns `None` when nothing was collected.
	pub fn format(&self, errors: &ErrorCollection) -> Option<ErrorDocument> {
		let mut objects = Vec::with_capacity(errors.len());
		for (key, entry) in errors {
			let message = match entry {
				ErrorEntry::Messages(messages) => messages.first(),
				ErrorEntry::Nested(nested) => nested
					.get(key)
					.or_else(|| nested.values().next())
					.and_then(|messages| messages.first()),
			};
			let Some(message) = message else {
				continue;
			};
			let field = if key == "type.type" { "type" } else { key.as_str() };
			objects.push(ErrorObject {
				code: self.settings.error_code,
				detail: format!(
					"The JSON field \"{}\" caused an exception: {}",
					field,
					message.to_lowercase()
				),
				source: self.source.map(|pointer| ErrorSource {
					pointer: pointer.to_string(),
				}),
			});
		}
		if objects.is_empty() {
			return None;
		}
		Some(ErrorDocument {
			jsonapi: JsonApiObject {
				version: self.settings.version.clone(),
			},
			errors: objects,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use indexmap::IndexMap;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_format_type_error() {
		let mut errors = ErrorCollection::new();
		errors.insert(
			"type.type".to_string(),
			ErrorEntry::message("\"wrong\" is not a correct object type."),
		);
		let settings = JsonApiSettings::default();
		let document = ErrorFormatter::new(&settings)
			.with_source(Some("http://testserver/test/1/"))
			.format(&errors)
			.unwrap();
		assert_eq!(
			serde_json::to_value(&document).unwrap(),
			json!({
				"jsonapi": {"version": "1.1"},
				"errors": [{
					"code": 403,
					"detail": "The JSON field \"type\" caused an exception: \"wrong\" is not a correct object type.",
					"source": {"pointer": "http://testserver/test/1/"},
				}],
			})
		);
	}

	#[rstest]
	fn test_first_message_is_lowercased() {
		let mut errors = ErrorCollection::new();
		errors.insert(
			"text".to_string(),
			ErrorEntry::Messages(vec![
				"Ensure this field has no more than 128 characters.".to_string(),
				"Second.".to_string(),
			]),
		);
		let settings = JsonApiSettings {
			error_code: 422,
			..Default::default()
		};
		let document = ErrorFormatter::new(&settings).format(&errors).unwrap();
		assert_eq!(document.errors.len(), 1);
		assert_eq!(document.errors[0].code, 422);
		assert_eq!(document.errors[0].source, None);
		assert_eq!(
			document.errors[0].detail,
			"The JSON field \"text\" caused an exception: ensure this field has no more than 128 characters."
		);
	}

	#[rstest]
	fn test_nested_entry_uses_own_key() {
		let mut nested = IndexMap::new();
		nested.insert("attributes.text".to_string(), vec!["Too long.".to_string()]);
		let mut errors = ErrorCollection::new();
		errors.insert("attributes.text".to_string(), ErrorEntry::Nested(nested));
		let settings = JsonApiSettings::default();
		let document = ErrorFormatter::new(&settings).format(&errors).unwrap();
		assert_eq!(
			document.errors[0].detail,
			"The JSON field \"attributes.text\" caused an exception: too long."
		);
	}

	#[rstest]
	fn test_empty_collection_formats_to_none() {
		let settings = JsonApiSettings::default();
		assert_eq!(ErrorFormatter::new(&settings).format(&ErrorCollection::new()), None);
		let mut errors = ErrorCollection::new();
		errors.insert("text".to_string(), ErrorEntry::Messages(vec![]));
		assert_eq!(ErrorFormatter::new(&settings).format(&errors), None);
	}
}
