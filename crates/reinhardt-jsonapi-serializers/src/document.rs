//! JSON:API document model

use crate::error::SerializerResult;
use crate::identifier::{Identifier, ResourceIdentifier};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource linkage of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
	Many(Vec<ResourceIdentifier>),
	One(ResourceIdentifier),
	Null,
}

impl Linkage {
	pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
		match self {
			Linkage::Many(items) => items.iter().collect(),
			Linkage::One(item) => vec![item],
			Linkage::Null => Vec::new(),
		}
	}

	pub fn ids(&self) -> Vec<Identifier> {
		self.identifiers()
			.into_iter()
			.map(|item| item.id.clone())
			.collect()
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Linkage::Many(items) => items.is_empty(),
			Linkage::One(_) => false,
			Linkage::Null => true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLinks {
	#[serde(rename = "self")]
	pub self_link: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub related: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
	pub data: Linkage,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub links: Option<RelationshipLinks>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLinks {
	#[serde(rename = "self")]
	pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
	#[serde(rename = "type")]
	pub resource_type: String,
	pub id: Identifier,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub attributes: Map<String, Value>,
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub relationships: IndexMap<String, RelationshipObject>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub links: Option<ResourceLinks>,
}

impl ResourceObject {
	pub fn new(resource_type: impl Into<String>, id: Identifier) -> Self {
		Self {
			resource_type: resource_type.into(),
			id,
			attributes: Map::new(),
			relationships: IndexMap::new(),
			links: None,
		}
	}

	pub fn identifier(&self) -> ResourceIdentifier {
		ResourceIdentifier::new(self.resource_type.clone(), self.id.clone())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
	Many(Vec<ResourceObject>),
	One(Box<ResourceObject>),
	Null,
}

/// A top-level document: primary data plus deduplicated `included`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub data: PrimaryData,
	#[serde(default)]
	pub included: Vec<ResourceObject>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub links: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

impl Document {
	pub fn single(data: ResourceObject, included: Vec<ResourceObject>) -> Self {
		Self {
			data: PrimaryData::One(Box::new(data)),
			included,
			links: None,
			meta: None,
		}
	}

	pub fn many(data: Vec<ResourceObject>, included: Vec<ResourceObject>) -> Self {
		Self {
			data: PrimaryData::Many(data),
			included,
			links: None,
			meta: None,
		}
	}

	pub fn to_value(&self) -> SerializerResult<Value> {
		Ok(serde_json::to_value(self)?)
	}
}

/// `included` accumulator keyed by `(type, id)`.
///
/// The first resource inserted under a key wins and insertion order is
/// preserved.
#[derive(Debug, Clone, Default)]
pub struct IncludedSet {
	entries: IndexMap<(String, Identifier), ResourceObject>,
}

impl IncludedSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, identifier: &ResourceIdentifier) -> bool {
		self.entries
			.contains_key(&(identifier.resource_type.clone(), identifier.id.clone()))
	}

	/// Returns `false` if an entry with the same identity was already present.
	pub fn insert(&mut self, resource: ResourceObject) -> bool {
		let key = (resource.resource_type.clone(), resource.id.clone());
		if self.entries.contains_key(&key) {
			return false;
		}
		self.entries.insert(key, resource);
		true
	}

	pub fn extend(&mut self, resources: impl IntoIterator<Item = ResourceObject>) {
		for resource in resources {
			self.insert(resource);
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn into_vec(self) -> Vec<ResourceObject> {
		self.entries.into_values().collect()
	}
}
