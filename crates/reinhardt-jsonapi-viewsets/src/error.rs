use http::{Method, StatusCode};
use reinhardt_jsonapi_filters::FilterError;
use reinhardt_jsonapi_serializers::{SerializerError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewSetError {
	#[error(transparent)]
	Serializer(#[from] SerializerError),

	#[error(transparent)]
	Filter(#[from] FilterError),

	#[error("Method {0} not allowed")]
	MethodNotAllowed(Method),

	#[error("No route matches `{0}`")]
	RouteNotFound(String),

	#[error("`{field}` is not a relationship of `{resource_type}`")]
	UnknownRelationship {
		resource_type: String,
		field: String,
	},

	#[error("Malformed request: {0}")]
	BadRequest(String),
}

impl From<StoreError> for ViewSetError {
	fn from(error: StoreError) -> Self {
		ViewSetError::Serializer(error.into())
	}
}

impl ViewSetError {
	pub fn status(&self) -> StatusCode {
		match self {
			ViewSetError::Serializer(SerializerError::NotFound { .. })
			| ViewSetError::RouteNotFound(_)
			| ViewSetError::UnknownRelationship { .. } => StatusCode::NOT_FOUND,
			ViewSetError::Serializer(SerializerError::Creation { .. })
			| ViewSetError::Filter(_)
			| ViewSetError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ViewSetError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
			ViewSetError::Serializer(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

pub type ViewSetResult<T> = Result<T, ViewSetError>;
