//! Resource identity: identifiers, resource identifier objects and
//! resource type derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Primary key of a resource.
///
/// JSON:API transmits ids as strings, but stores in this workspace use
/// integer keys most of the time. Both are accepted and rendered as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
	Int(i64),
	Str(String),
}

impl Identifier {
	/// Reads an identifier from a JSON value.
	///
	/// Integer strings are normalized to [`Identifier::Int`] so that `"12"`
	/// and `12` address the same record.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_jsonapi_serializers::Identifier;
	/// use serde_json::json;
	///
	/// assert_eq!(Identifier::from_value(&json!(12)), Some(Identifier::Int(12)));
	/// assert_eq!(Identifier::from_value(&json!("12")), Some(Identifier::Int(12)));
	/// assert_eq!(Identifier::from_value(&json!("abc")), Some(Identifier::from("abc")));
	/// assert_eq!(Identifier::from_value(&json!(null)), None);
	/// ```
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Number(number) => number.as_i64().map(Identifier::Int),
			Value::String(text) => Self::parse(text),
			_ => None,
		}
	}

	/// Parses an identifier from a path segment or query value.
	pub fn parse(text: &str) -> Option<Self> {
		let text = text.trim();
		if text.is_empty() {
			return None;
		}
		Some(match text.parse::<i64>() {
			Ok(number) => Identifier::Int(number),
			Err(_) => Identifier::Str(text.to_string()),
		})
	}

	pub fn to_value(&self) -> Value {
		match self {
			Identifier::Int(number) => Value::from(*number),
			Identifier::Str(text) => Value::String(text.clone()),
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Identifier::Int(number) => Some(*number),
			Identifier::Str(_) => None,
		}
	}
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Identifier::Int(number) => write!(f, "{}", number),
			Identifier::Str(text) => write!(f, "{}", text),
		}
	}
}

impl From<i64> for Identifier {
	fn from(value: i64) -> Self {
		Identifier::Int(value)
	}
}

impl From<&str> for Identifier {
	fn from(value: &str) -> Self {
		Identifier::Str(value.to_string())
	}
}

impl From<String> for Identifier {
	fn from(value: String) -> Self {
		Identifier::Str(value)
	}
}

/// A `{"type": ..., "id": ...}` resource identifier object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
	#[serde(rename = "type")]
	pub resource_type: String,
	pub id: Identifier,
}

impl ResourceIdentifier {
	pub fn new(resource_type: impl Into<String>, id: impl Into<Identifier>) -> Self {
		Self {
			resource_type: resource_type.into(),
			id: id.into(),
		}
	}

	pub fn to_value(&self) -> Value {
		serde_json::json!({
			"type": self.resource_type,
			"id": self.id.to_value(),
		})
	}
}

/// Derives the JSON:API resource type from a model name.
///
/// A hyphen is inserted before every uppercase letter except a leading
/// one, then the whole name is lowercased.
///
/// # Examples
///
/// ```
/// use reinhardt_jsonapi_serializers::resource_type_for;
///
/// assert_eq!(resource_type_for("TestIncludedRelation"), "test-included-relation");
/// assert_eq!(resource_type_for("Test"), "test");
/// ```
pub fn resource_type_for(model_name: &str) -> String {
	let mut resource_type = String::with_capacity(model_name.len() + 4);
	for (index, ch) in model_name.chars().enumerate() {
		if ch.is_uppercase() && index > 0 {
			resource_type.push('-');
		}
		resource_type.extend(ch.to_lowercase());
	}
	resource_type
}
