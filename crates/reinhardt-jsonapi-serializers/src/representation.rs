//! Record to document rendering
//!
//! Every resource object gets its identity, its attribute values, a
//! relationship entry per relationship field, and `links` when the request
//! URL is known. Related objects reached through relationships are
//! rendered one level deep into `included`, deduplicated by `(type, id)`.

use crate::context::SerializationContext;
use crate::document::{
	Document, IncludedSet, RelationshipLinks, RelationshipObject, ResourceLinks, ResourceObject,
};
use crate::error::SerializerResult;
use crate::fields::Cardinality;
use crate::identifier::Identifier;
use crate::registry::ResourceDefinition;
use crate::relations::RelationshipResolver;
use crate::store::{ColumnKind, RecordRef};

/// Appends `{id}/` to `url` unless it already addresses that id.
pub fn detail_url(url: &str, id: &Identifier) -> String {
	let suffix = format!("{}/", id);
	if url.ends_with(&format!("/{}", suffix)) {
		return url.to_string();
	}
	if url.ends_with('/') {
		format!("{}{}", url, suffix)
	} else {
		format!("{}/{}", url, suffix)
	}
}

pub struct RepresentationBuilder<'a> {
	definition: &'a ResourceDefinition,
	context: &'a SerializationContext,
}

impl<'a> RepresentationBuilder<'a> {
	pub fn new(definition: &'a ResourceDefinition, context: &'a SerializationContext) -> Self {
		Self {
			definition,
			context,
		}
	}

	pub async fn represent(&self, record: &RecordRef) -> SerializerResult<Document> {
		let mut included = IncludedSet::new();
		let data = self.resource_object(record, &mut included).await?;
		Ok(Document::single(data, included.into_vec()))
	}

	/// Renders a collection. Members share one `included` set, so a
	/// related object reached from several members appears once.
	pub async fn represent_many(&self, records: &[RecordRef]) -> SerializerResult<Document> {
		let mut data = Vec::with_capacity(records.len());
		let mut included = IncludedSet::new();
		for record in records {
			data.push(self.resource_object(record, &mut included).await?);
		}
		tracing::debug!(
			"Represented {} {} resource(s) with {} included",
			data.len(),
			self.definition.resource_type(),
			included.len()
		);
		Ok(Document::many(data, included.into_vec()))
	}

	/// Renders one primary resource, adding related objects to `included`.
	pub async fn resource_object(
		&self,
		record: &RecordRef,
		included: &mut IncludedSet,
	) -> SerializerResult<ResourceObject> {
		let identifier = self.definition.identify(record.as_ref());
		let url = self
			.context
			.base_url()
			.map(|base| detail_url(&base, &identifier.id));
		let include = !self.context.is_include_disabled();

		let mut object = ResourceObject::new(identifier.resource_type, identifier.id);
		let registry = self.definition.registry();
		for name in registry.attributes().keys() {
			let value = record.attribute(name).await?;
			object.attributes.insert(name.clone(), value);
		}

		for (name, descriptor) in registry.relationships() {
			let cardinality = descriptor.cardinality().unwrap_or(Cardinality::Single);
			let related = RelationshipResolver::resolve(record.as_ref(), name, cardinality).await?;
			let links = url.as_ref().map(|url| RelationshipLinks {
				self_link: format!("{}relationships/{}/", url, name),
				related: if related.is_empty() {
					None
				} else {
					Some(format!("{}{}/", url, name))
				},
			});
			object.relationships.insert(
				name.clone(),
				RelationshipObject {
					data: RelationshipResolver::linkage(&related, cardinality),
					links,
				},
			);
			if include {
				for related_record in &related {
					self.include(related_record, included).await?;
				}
			}
		}

		object.links = url.map(|self_link| ResourceLinks { self_link });
		Ok(object)
	}

	/// Renders a related record from its own model schema: every non-key
	/// column as an attribute, forward relations as linkage only.
	async fn include(&self, record: &RecordRef, included: &mut IncludedSet) -> SerializerResult<()> {
		let identifier = RelationshipResolver::identify(record.as_ref());
		if included.contains(&identifier) {
			return Ok(());
		}
		let schema = record.schema();
		let mut object = ResourceObject::new(identifier.resource_type, identifier.id);
		for column in schema.scalar_columns().filter(|column| !column.primary_key) {
			let value = record.attribute(&column.name).await?;
			object.attributes.insert(column.name.clone(), value);
		}
		for column in schema.forward_relations() {
			let cardinality = match column.kind {
				ColumnKind::ManyToMany { .. } => Cardinality::Multi,
				_ => Cardinality::Single,
			};
			let related =
				RelationshipResolver::resolve(record.as_ref(), &column.name, cardinality).await?;
			if related.is_empty() {
				continue;
			}
			object.relationships.insert(
				column.name.clone(),
				RelationshipObject {
					data: RelationshipResolver::linkage(&related, cardinality),
					links: None,
				},
			);
		}
		object.links = self
			.context
			.detail_url(&object.resource_type, &object.id)
			.map(|self_link| ResourceLinks { self_link });
		included.insert(object);
		Ok(())
	}
}
