use crate::action::{Action, RouteMiss};
use crate::error::{ViewSetError, ViewSetResult};
use crate::request::{ApiRequest, ApiResponse};
use http::StatusCode;
use reinhardt_jsonapi_filters::{FilterBackend, JsonApiFilter, LimitOffsetPagination};
use reinhardt_jsonapi_serializers::representation::detail_url;
use reinhardt_jsonapi_serializers::{
	Cardinality, ErrorDocument, ErrorFormatter, ErrorObject, FieldDescriptor, Identifier,
	JsonApiObject, JsonApiSettings, PathReverser, RecordStore, RelationshipResolver,
	ResourceDefinition, ResourceSerializer, SerializationContext, SerializerError, StoreQuery,
	UrlReverser, ValidationPipeline,
};
use serde_json::{Value, json};
use std::sync::Arc;

/// Serves one resource type: collection, detail, relationship and related
/// endpoints mounted below `<prefix><basename>/`.
pub struct JsonApiViewSet {
	basename: String,
	prefix: String,
	serializer: ResourceSerializer,
	store: Arc<dyn RecordStore>,
	filter_backend: Arc<dyn FilterBackend>,
	pagination: LimitOffsetPagination,
	reverser: Option<Arc<dyn UrlReverser>>,
	settings: Arc<JsonApiSettings>,
}

impl JsonApiViewSet {
	/// The basename defaults to the resource type, so routes and reversed
	/// URLs line up with the `type` member of the documents.
	pub fn new(definition: Arc<ResourceDefinition>, store: Arc<dyn RecordStore>) -> Self {
		let settings = Arc::new(JsonApiSettings::default());
		Self {
			basename: definition.resource_type().to_string(),
			prefix: "/".to_string(),
			serializer: ResourceSerializer::new(definition),
			store,
			filter_backend: Arc::new(JsonApiFilter::new()),
			pagination: LimitOffsetPagination::from_settings(&settings),
			reverser: None,
			settings,
		}
	}

	/// Also resets pagination limits from the new settings.
	pub fn with_settings(mut self, settings: Arc<JsonApiSettings>) -> Self {
		self.pagination = LimitOffsetPagination::from_settings(&settings);
		self.settings = settings;
		self
	}

	pub fn with_pagination(mut self, pagination: LimitOffsetPagination) -> Self {
		self.pagination = pagination;
		self
	}

	pub fn with_filter_backend(mut self, backend: Arc<dyn FilterBackend>) -> Self {
		self.filter_backend = backend;
		self
	}

	pub fn with_reverser(mut self, reverser: Arc<dyn UrlReverser>) -> Self {
		self.reverser = Some(reverser);
		self
	}

	pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
		self.basename = basename.into();
		self
	}

	/// Mounts the viewset below `prefix`, e.g. `/api/`.
	pub fn mount(mut self, prefix: impl Into<String>) -> Self {
		let mut prefix = prefix.into();
		if !prefix.ends_with('/') {
			prefix.push('/');
		}
		self.prefix = prefix;
		self
	}

	pub fn basename(&self) -> &str {
		&self.basename
	}

	pub fn collection_path(&self) -> String {
		format!("{}{}/", self.prefix, self.basename)
	}

	/// Routes `request` and renders failures as responses.
	pub async fn dispatch(&self, request: &ApiRequest) -> ApiResponse {
		match self.handle(request).await {
			Ok(response) => response,
			Err(error) => self.error_response(&error),
		}
	}

	pub async fn handle(&self, request: &ApiRequest) -> ViewSetResult<ApiResponse> {
		let action = Action::resolve(&request.method, &self.collection_path(), &request.path)
			.map_err(|miss| match miss {
				RouteMiss::NoRoute => ViewSetError::RouteNotFound(request.path.clone()),
				RouteMiss::MethodNotAllowed => ViewSetError::MethodNotAllowed(request.method.clone()),
			})?;
		tracing::debug!("{} {} -> {:?}", request.method, request.path, action);
		match action {
			Action::List => self.list(request).await,
			Action::Create => self.create(request).await,
			Action::Retrieve(id) => self.retrieve(request, &id).await,
			Action::Update(id) => self.update(request, &id, false).await,
			Action::PartialUpdate(id) => self.update(request, &id, true).await,
			Action::Relationship { id, field } => self.relationship(request, &id, &field).await,
			Action::UpdateRelationship { id, field } => {
				self.update_relationship(request, &id, &field).await
			}
			Action::Related { id, field } => self.related(request, &id, &field).await,
		}
	}

	/// Filters, orders by id and paginates the collection.
	pub async fn list(&self, request: &ApiRequest) -> ViewSetResult<ApiResponse> {
		let query = self
			.filter_backend
			.filter_query(&request.query, self.store.schema(), StoreQuery::new().order_by("id"))
			.await?;
		let page = self.pagination.parse(&request.query)?;
		let count = self.store.count(&query.filters).await?;
		let records = self.store.list(&query.window(page.limit, page.offset)).await?;
		if records.is_empty() {
			return Ok(ApiResponse::ok(json!({ "data": [] })));
		}
		let mut document = self.serializer(request).represent_many(&records).await?;
		self.pagination
			.decorate(&mut document, &request.url(), page, count)?;
		Ok(ApiResponse::ok(document.to_value()?))
	}

	pub async fn retrieve(&self, request: &ApiRequest, id: &Identifier) -> ViewSetResult<ApiResponse> {
		let Some(record) = self.store.get(id).await? else {
			return Ok(ApiResponse::not_found(json!({ "data": null })));
		};
		let document = self.serializer(request).represent(&record).await?;
		Ok(ApiResponse::ok(document.to_value()?))
	}

	/// Creates one record, or one per member when `data` is a list.
	pub async fn create(&self, request: &ApiRequest) -> ViewSetResult<ApiResponse> {
		let serializer = self.serializer(request);
		let store = self.store.as_ref();

		if request.body.get("data").is_some_and(Value::is_array) {
			let mut bound = serializer.bind_many(request.body.clone());
			if !bound.is_valid().await? {
				return self.invalid(bound.errors()?);
			}
			let records = bound.create(store).await?;
			let document = serializer.represent_many(&records).await?;
			return Ok(ApiResponse::created(document.to_value()?));
		}

		let mut bound = serializer.bind(request.body.clone());
		if !bound.is_valid().await? {
			return self.invalid(bound.errors()?);
		}
		let record = bound.create(store).await?;
		let location = detail_url(&request.context().url(), &record.id());
		let document = serializer.represent(&record).await?;
		Ok(ApiResponse::created(document.to_value()?).with_location(location))
	}

	pub async fn update(
		&self,
		request: &ApiRequest,
		id: &Identifier,
		partial: bool,
	) -> ViewSetResult<ApiResponse> {
		if self.store.get(id).await?.is_none() {
			return Ok(ApiResponse::not_found(json!({ "data": null })));
		}
		let serializer = self.serializer(request);
		let mut bound = if partial {
			serializer.bind_partial(request.body.clone())
		} else {
			serializer.bind(request.body.clone())
		};
		if !bound.is_valid().await? {
			return self.invalid(bound.errors()?);
		}
		let record = bound.update(self.store.as_ref(), id).await?;
		let document = serializer.represent(&record).await?;
		Ok(ApiResponse::ok(document.to_value()?))
	}

	/// Linkage of one relationship, each member with its own `links.self`.
	pub async fn relationship(
		&self,
		request: &ApiRequest,
		id: &Identifier,
		field: &str,
	) -> ViewSetResult<ApiResponse> {
		let cardinality = self.relationship_cardinality(field)?;
		let Some(record) = self.store.get(id).await? else {
			return Ok(ApiResponse::not_found(json!({ "data": null })));
		};
		let related = RelationshipResolver::resolve(record.as_ref(), field, cardinality).await?;
		let context = self.context(request);
		let mut items = related.iter().map(|related| {
			let identifier = RelationshipResolver::identify(related.as_ref());
			let mut item = identifier.to_value();
			if let Some(link) = context.detail_url(&identifier.resource_type, &identifier.id) {
				item["links"] = json!({ "self": link });
			}
			item
		});
		let data = match cardinality {
			Cardinality::Multi => Value::Array(items.collect()),
			Cardinality::Single => items.next().unwrap_or(Value::Null),
		};
		Ok(ApiResponse::ok(json!({ "data": data })))
	}

	/// Replaces the members of one relationship.
	pub async fn update_relationship(
		&self,
		request: &ApiRequest,
		id: &Identifier,
		field: &str,
	) -> ViewSetResult<ApiResponse> {
		self.relationship_cardinality(field)?;
		if self.store.get(id).await?.is_none() {
			return Ok(ApiResponse::not_found(json!({ "data": null })));
		}
		let linkage = match ValidationPipeline::new(self.serializer.definition())
			.validate_relationship(field, &request.body)
			.await
		{
			Ok(linkage) => linkage,
			Err(SerializerError::Validation(errors)) => {
				let source = request.context().url();
				let document = ErrorFormatter::new(&self.settings)
					.with_source(Some(source.as_str()))
					.format(&errors);
				return self.invalid(document);
			}
			Err(other) => return Err(other.into()),
		};
		self.store
			.set_related(id, field, &linkage.ids())
			.await
			.map_err(|error| {
				let model = self.store.schema().name().to_string();
				tracing::error!("{}.set_related() failed: {}", model, error);
				SerializerError::Creation {
					model,
					operation: "set_related",
					message: error.to_string(),
				}
			})?;
		Ok(ApiResponse::ok(json!({ "data": linkage })))
	}

	/// Redirects to the related resource, or to a filtered collection for
	/// to-many relationships.
	pub async fn related(
		&self,
		request: &ApiRequest,
		id: &Identifier,
		field: &str,
	) -> ViewSetResult<ApiResponse> {
		let cardinality = self.relationship_cardinality(field)?;
		let empty = match cardinality {
			Cardinality::Multi => json!({ "data": [] }),
			Cardinality::Single => json!({ "data": null }),
		};
		let Some(record) = self.store.get(id).await? else {
			return Ok(ApiResponse::not_found(empty));
		};
		let related = RelationshipResolver::resolve(record.as_ref(), field, cardinality).await?;
		let Some(first) = related.first() else {
			return Ok(ApiResponse::not_found(empty));
		};
		let context = self.context(request);
		let identifier = RelationshipResolver::identify(first.as_ref());

		let location = match cardinality {
			Cardinality::Single => context
				.detail_url(&identifier.resource_type, &identifier.id)
				.ok_or_else(|| {
					ViewSetError::RouteNotFound(format!("{}-detail", identifier.resource_type))
				})?,
			Cardinality::Multi => {
				let list = context.list_url(&identifier.resource_type).ok_or_else(|| {
					ViewSetError::RouteNotFound(format!("{}-list", identifier.resource_type))
				})?;
				let ids: Vec<String> = related.iter().map(|record| record.id().to_string()).collect();
				format!("{}?filter[id]={}", list, ids.join(","))
			}
		};
		Ok(ApiResponse::redirect(location))
	}

	fn relationship_cardinality(&self, field: &str) -> ViewSetResult<Cardinality> {
		self.serializer
			.definition()
			.registry()
			.relationships()
			.get(field)
			.and_then(FieldDescriptor::cardinality)
			.ok_or_else(|| ViewSetError::UnknownRelationship {
				resource_type: self.serializer.definition().resource_type().to_string(),
				field: field.to_string(),
			})
	}

	fn context(&self, request: &ApiRequest) -> SerializationContext {
		let reverser = self.reverser.clone().unwrap_or_else(|| {
			Arc::new(PathReverser::new(format!(
				"{}://{}{}",
				request.scheme, request.host, self.prefix
			)))
		});
		SerializationContext::new()
			.with_request(request.context())
			.with_reverser(reverser)
			.with_settings(self.settings.clone())
	}

	fn serializer(&self, request: &ApiRequest) -> ResourceSerializer {
		self.serializer.clone().with_context(self.context(request))
	}

	fn error_status(&self) -> StatusCode {
		StatusCode::from_u16(self.settings.error_code).unwrap_or(StatusCode::FORBIDDEN)
	}

	fn invalid(&self, errors: Option<ErrorDocument>) -> ViewSetResult<ApiResponse> {
		let body = serde_json::to_value(errors).map_err(SerializerError::from)?;
		Ok(ApiResponse::new(self.error_status(), body))
	}

	fn error_response(&self, error: &ViewSetError) -> ApiResponse {
		if let ViewSetError::Serializer(SerializerError::NotFound { .. }) = error {
			return ApiResponse::not_found(json!({ "data": null }));
		}
		let status = error.status();
		if status.is_server_error() {
			tracing::error!("{} request failed: {}", self.basename, error);
		} else {
			tracing::warn!("{} request rejected: {}", self.basename, error);
		}
		let document = ErrorDocument {
			jsonapi: JsonApiObject {
				version: self.settings.version.clone(),
			},
			errors: vec![ErrorObject {
				code: status.as_u16(),
				detail: error.to_string(),
				source: None,
			}],
		};
		ApiResponse::new(
			status,
			serde_json::to_value(document).unwrap_or(Value::Null),
		)
	}
}
