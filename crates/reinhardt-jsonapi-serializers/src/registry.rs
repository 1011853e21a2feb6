//! Field registry and resource definitions
//!
//! A [`ResourceDefinition`] is the built form of a serializer declaration:
//! explicitly declared fields, fields derived from a [`ModelSchema`], the
//! field selection (`fields` / `exclude`), read-only overrides, per-field
//! hooks and document-level validators. Building a definition checks the
//! declaration and sorts the resulting fields into the identity,
//! attribute and relationship buckets of a [`FieldRegistry`].
//!
//! # Examples
//!
//! ```
//! use reinhardt_jsonapi_serializers::{FieldDescriptor, ResourceDefinition};
//!
//! let definition = ResourceDefinition::builder("ArticleSerializer")
//!     .resource_type("article")
//!     .field("title", FieldDescriptor::char().max_length(128))
//!     .field("author", FieldDescriptor::single_relation().related_type("person"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(definition.resource_type(), "article");
//! assert!(definition.registry().attributes().contains_key("title"));
//! assert!(definition.registry().relationships().contains_key("author"));
//! ```

use crate::error::ConfigurationError;
use crate::fields::{FieldDescriptor, FieldKind};
use crate::identifier::{ResourceIdentifier, resource_type_for};
use crate::store::{ColumnInfo, ColumnKind, ModelSchema, Record};
use crate::validator::{FieldHook, FieldValidator};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Which model columns a definition exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
	All,
	Only(Vec<String>),
}

impl FieldSelection {
	pub fn only<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		FieldSelection::Only(names.into_iter().map(Into::into).collect())
	}
}

/// Fields of a resource, grouped the way they appear in a document.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
	resource_type: FieldDescriptor,
	id: FieldDescriptor,
	attributes: IndexMap<String, FieldDescriptor>,
	relationships: IndexMap<String, FieldDescriptor>,
}

impl FieldRegistry {
	/// The `type` and `id` descriptors, in that order.
	pub fn identity(&self) -> [(&str, &FieldDescriptor); 2] {
		[("type", &self.resource_type), ("id", &self.id)]
	}

	pub fn attributes(&self) -> &IndexMap<String, FieldDescriptor> {
		&self.attributes
	}

	pub fn relationships(&self) -> &IndexMap<String, FieldDescriptor> {
		&self.relationships
	}

	pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
		match name {
			"type" => Some(&self.resource_type),
			"id" => Some(&self.id),
			_ => self
				.attributes
				.get(name)
				.or_else(|| self.relationships.get(name)),
		}
	}

	/// Every field, identity first, then attributes, then relationships.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
		self.identity().into_iter().chain(
			self.attributes
				.iter()
				.chain(self.relationships.iter())
				.map(|(name, descriptor)| (name.as_str(), descriptor)),
		)
	}
}

#[derive(Clone)]
pub struct ResourceDefinition {
	name: String,
	resource_type: String,
	resource_type_override: Option<String>,
	schema: Option<Arc<ModelSchema>>,
	registry: FieldRegistry,
	declared: IndexMap<String, FieldDescriptor>,
	fields: Option<FieldSelection>,
	exclude: Option<Vec<String>>,
	read_only_fields: Option<Vec<String>>,
	hooks: IndexMap<String, Arc<dyn FieldHook>>,
	document_validators: Vec<(String, Arc<dyn FieldValidator>)>,
}

impl fmt::Debug for ResourceDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResourceDefinition")
			.field("name", &self.name)
			.field("resource_type", &self.resource_type)
			.field("schema", &self.schema.as_ref().map(|schema| schema.name()))
			.field("registry", &self.registry)
			.field("hooks", &self.hooks.keys().collect::<Vec<_>>())
			.field("document_validators", &self.document_validators.len())
			.finish()
	}
}

impl ResourceDefinition {
	pub fn builder(name: impl Into<String>) -> ResourceDefinitionBuilder {
		ResourceDefinitionBuilder::new(name)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn resource_type(&self) -> &str {
		&self.resource_type
	}

	pub fn schema(&self) -> Option<&ModelSchema> {
		self.schema.as_deref()
	}

	pub fn registry(&self) -> &FieldRegistry {
		&self.registry
	}

	/// Hook registered for `field`, run after the field validates.
	pub fn hook(&self, field: &str) -> Option<&Arc<dyn FieldHook>> {
		self.hooks.get(field)
	}

	pub fn document_validators(&self) -> &[(String, Arc<dyn FieldValidator>)] {
		&self.document_validators
	}

	pub fn identify(&self, record: &dyn Record) -> ResourceIdentifier {
		ResourceIdentifier::new(self.resource_type.clone(), record.id())
	}
}

pub struct ResourceDefinitionBuilder {
	name: String,
	base: Option<ResourceDefinition>,
	schema: Option<Arc<ModelSchema>>,
	resource_type: Option<String>,
	declared: IndexMap<String, FieldDescriptor>,
	duplicates: Vec<String>,
	fields: Option<FieldSelection>,
	exclude: Option<Vec<String>>,
	read_only_fields: Option<Vec<String>>,
	hooks: IndexMap<String, Arc<dyn FieldHook>>,
	document_validators: Vec<(String, Arc<dyn FieldValidator>)>,
}

impl ResourceDefinitionBuilder {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			base: None,
			schema: None,
			resource_type: None,
			declared: IndexMap::new(),
			duplicates: Vec::new(),
			fields: None,
			exclude: None,
			read_only_fields: None,
			hooks: IndexMap::new(),
			document_validators: Vec::new(),
		}
	}

	/// Inherits declarations and options from `base`.
	///
	/// Fields declared on this builder override base fields of the same
	/// name; options left unset here fall back to the base values.
	pub fn inherit(mut self, base: &ResourceDefinition) -> Self {
		self.base = Some(base.clone());
		self
	}

	pub fn model(mut self, schema: impl Into<Arc<ModelSchema>>) -> Self {
		self.schema = Some(schema.into());
		self
	}

	pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
		self.resource_type = Some(resource_type.into());
		self
	}

	/// Declares a field. Relationship kinds land in the relationship
	/// bucket, everything else is an attribute.
	pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
		let name = name.into();
		if self.declared.contains_key(&name) {
			self.duplicates.push(name.clone());
		}
		self.declared.insert(name, descriptor);
		self
	}

	pub fn fields(mut self, selection: FieldSelection) -> Self {
		self.fields = Some(selection);
		self
	}

	pub fn all_fields(self) -> Self {
		self.fields(FieldSelection::All)
	}

	pub fn only_fields<I, S>(self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields(FieldSelection::only(names))
	}

	pub fn exclude<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude = Some(names.into_iter().map(Into::into).collect());
		self
	}

	pub fn read_only_fields<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.read_only_fields = Some(names.into_iter().map(Into::into).collect());
		self
	}

	/// Registers the per-field hook for `field`.
	pub fn hook(mut self, field: impl Into<String>, hook: Arc<dyn FieldHook>) -> Self {
		self.hooks.insert(field.into(), hook);
		self
	}

	/// Adds a validator over a dotted path of the raw `data` object, such as
	/// `attributes.text` or `id`.
	pub fn document_validator(
		mut self,
		path: impl Into<String>,
		validator: Arc<dyn FieldValidator>,
	) -> Self {
		self.document_validators.push((path.into(), validator));
		self
	}

	pub fn build(self) -> Result<ResourceDefinition, ConfigurationError> {
		let serializer = self.name;
		if let Some(field) = self.duplicates.into_iter().next() {
			return Err(ConfigurationError::DuplicateField { serializer, field });
		}

		let own_declared: HashSet<String> = self.declared.keys().cloned().collect();
		let (
			declared,
			schema,
			resource_type_override,
			fields,
			exclude,
			read_only_fields,
			hooks,
			document_validators,
		) = match self.base {
			Some(base) => {
				let mut declared = base.declared;
				for (name, descriptor) in self.declared {
					declared.insert(name, descriptor);
				}
				let (fields, exclude) = if self.fields.is_none() && self.exclude.is_none() {
					(base.fields, base.exclude)
				} else {
					(self.fields, self.exclude)
				};
				let mut hooks = base.hooks;
				hooks.extend(self.hooks);
				let mut document_validators = base.document_validators;
				document_validators.extend(self.document_validators);
				(
					declared,
					self.schema.or(base.schema),
					self.resource_type.or(base.resource_type_override),
					fields,
					exclude,
					self.read_only_fields.or(base.read_only_fields),
					hooks,
					document_validators,
				)
			}
			None => (
				self.declared,
				self.schema,
				self.resource_type,
				self.fields,
				self.exclude,
				self.read_only_fields,
				self.hooks,
				self.document_validators,
			),
		};

		if fields.is_some() && exclude.is_some() {
			return Err(ConfigurationError::FieldsAndExclude { serializer });
		}

		let resource_type = match (&resource_type_override, &schema) {
			(Some(resource_type), _) => resource_type.clone(),
			(None, Some(schema)) => schema.resource_type(),
			(None, None) => return Err(ConfigurationError::MissingResourceType { serializer }),
		};

		let selection = Selection {
			serializer: &serializer,
			declared: &declared,
			own_declared: &own_declared,
			fields: fields.as_ref(),
			exclude: exclude.as_deref(),
		};
		let names = match schema.as_deref() {
			Some(schema) => selection.model_field_names(schema)?,
			None => selection.declared_field_names()?,
		};

		let read_only: HashSet<&str> = read_only_fields
			.iter()
			.flatten()
			.map(String::as_str)
			.collect();
		let mut attributes = IndexMap::new();
		let mut relationships = IndexMap::new();
		for name in names {
			if name == "type" || name == "id" {
				continue;
			}
			let descriptor = match declared.get(&name) {
				Some(descriptor) => descriptor.clone(),
				None => match schema.as_deref().and_then(|schema| schema.get(&name)) {
					Some(column) if column.primary_key => continue,
					Some(column) => descriptor_for_column(column),
					None => {
						return Err(ConfigurationError::UnknownField {
							serializer,
							model: schema_name(schema.as_deref()),
							field: name,
						});
					}
				},
			};
			let descriptor = if read_only.contains(name.as_str()) {
				descriptor.read_only()
			} else {
				descriptor
			};
			if descriptor.is_relationship() {
				relationships.insert(name, descriptor);
			} else {
				attributes.insert(name, descriptor);
			}
		}

		tracing::debug!(
			"Built resource definition {} ({}): {} attribute(s), {} relationship(s)",
			serializer,
			resource_type,
			attributes.len(),
			relationships.len()
		);

		Ok(ResourceDefinition {
			registry: FieldRegistry {
				resource_type: FieldDescriptor::resource_type(resource_type.clone()),
				id: FieldDescriptor::resource_id(),
				attributes,
				relationships,
			},
			name: serializer,
			resource_type,
			resource_type_override,
			schema,
			declared,
			fields,
			exclude,
			read_only_fields,
			hooks,
			document_validators,
		})
	}
}

fn schema_name(schema: Option<&ModelSchema>) -> String {
	schema.map(|schema| schema.name().to_string()).unwrap_or_default()
}

struct Selection<'a> {
	serializer: &'a str,
	declared: &'a IndexMap<String, FieldDescriptor>,
	own_declared: &'a HashSet<String>,
	fields: Option<&'a FieldSelection>,
	exclude: Option<&'a [String]>,
}

impl Selection<'_> {
	fn model_field_names(&self, schema: &ModelSchema) -> Result<Vec<String>, ConfigurationError> {
		let mut defaults: Vec<String> = self.declared.keys().cloned().collect();
		for column in schema.columns() {
			if column.auto_created && !column.primary_key {
				continue;
			}
			if !self.declared.contains_key(&column.name) {
				defaults.push(column.name.clone());
			}
		}

		match (self.fields, self.exclude) {
			(Some(FieldSelection::All), _) => Ok(defaults),
			(Some(FieldSelection::Only(names)), _) => {
				self.check_declared_included(names)?;
				for name in names {
					let known = name == "type"
						|| name == "id" || self.declared.contains_key(name)
						|| schema.get(name).is_some();
					if !known {
						return Err(ConfigurationError::UnknownField {
							serializer: self.serializer.to_string(),
							model: schema.name().to_string(),
							field: name.clone(),
						});
					}
				}
				Ok(names.clone())
			}
			(None, Some(excluded)) => {
				for name in excluded {
					if self.declared.contains_key(name) {
						return Err(ConfigurationError::ExcludedDeclaredField {
							serializer: self.serializer.to_string(),
							field: name.clone(),
						});
					}
					if schema.get(name).is_none() {
						return Err(ConfigurationError::ExcludedUnknownField {
							serializer: self.serializer.to_string(),
							field: name.clone(),
						});
					}
				}
				Ok(defaults
					.into_iter()
					.filter(|name| !excluded.contains(name))
					.collect())
			}
			(None, None) => Err(ConfigurationError::MissingFieldSelection {
				serializer: self.serializer.to_string(),
			}),
		}
	}

	fn declared_field_names(&self) -> Result<Vec<String>, ConfigurationError> {
		match (self.fields, self.exclude) {
			(Some(FieldSelection::Only(names)), _) => {
				self.check_declared_included(names)?;
				if let Some(name) = names
					.iter()
					.find(|name| !self.declared.contains_key(*name) && *name != "type" && *name != "id")
				{
					return Err(ConfigurationError::UnknownField {
						serializer: self.serializer.to_string(),
						model: String::new(),
						field: name.clone(),
					});
				}
				Ok(names.clone())
			}
			(None, Some(excluded)) => {
				if let Some(name) = excluded.iter().find(|name| !self.declared.contains_key(*name)) {
					return Err(ConfigurationError::ExcludedUnknownField {
						serializer: self.serializer.to_string(),
						field: name.clone(),
					});
				}
				Ok(self
					.declared
					.keys()
					.filter(|name| !excluded.contains(*name))
					.cloned()
					.collect())
			}
			_ => Ok(self.declared.keys().cloned().collect()),
		}
	}

	fn check_declared_included(&self, names: &[String]) -> Result<(), ConfigurationError> {
		match self
			.declared
			.keys()
			.find(|name| self.own_declared.contains(*name) && !names.contains(*name))
		{
			Some(field) => Err(ConfigurationError::DeclaredFieldNotIncluded {
				serializer: self.serializer.to_string(),
				field: field.clone(),
			}),
			None => Ok(()),
		}
	}
}

/// Derives a descriptor from a model column.
pub fn descriptor_for_column(column: &ColumnInfo) -> FieldDescriptor {
	let descriptor = match (&column.kind, &column.choices) {
		(ColumnKind::ForeignKey { to }, _) => {
			FieldDescriptor::single_relation().related_type(resource_type_for(to))
		}
		(ColumnKind::ManyToMany { to }, _) => {
			FieldDescriptor::multi_relation().related_type(resource_type_for(to))
		}
		(_, Some(choices)) => FieldDescriptor::choice(choices.clone()),
		(kind, None) => FieldDescriptor::new(field_kind_for(kind)),
	};
	let mut descriptor = descriptor.required(!column.is_optional());
	if column.nullable {
		descriptor = descriptor.allow_null();
	}
	if column.blank {
		descriptor = descriptor.allow_blank();
	}
	descriptor
}

fn field_kind_for(kind: &ColumnKind) -> FieldKind {
	match kind {
		ColumnKind::Integer => FieldKind::Integer {
			min: None,
			max: None,
		},
		ColumnKind::Float => FieldKind::Float {
			min: None,
			max: None,
		},
		ColumnKind::Boolean => FieldKind::Boolean,
		ColumnKind::Text { max_length } => FieldKind::Char {
			max_length: *max_length,
			min_length: None,
			allow_blank: false,
		},
		ColumnKind::Array { child, size } => FieldKind::List {
			child: Box::new(field_kind_for(child)),
			min_length: None,
			max_length: *size,
		},
		ColumnKind::Json => FieldKind::Json,
		ColumnKind::ForeignKey { to } => FieldKind::Relationship {
			cardinality: crate::fields::Cardinality::Single,
			related_type: Some(resource_type_for(to)),
		},
		ColumnKind::ManyToMany { to } => FieldKind::Relationship {
			cardinality: crate::fields::Cardinality::Multi,
			related_type: Some(resource_type_for(to)),
		},
	}
}
