//! Per-call serialization context

use crate::identifier::Identifier;
use crate::settings::JsonApiSettings;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Reverses a named route into an absolute URL.
pub trait UrlReverser: Send + Sync {
	fn reverse(&self, name: &str, params: &HashMap<String, String>) -> Result<String, String>;
}

/// Reverses `<basename>-list` and `<basename>-detail` routes mounted below a
/// common prefix, e.g. `http://testserver/api/`.
#[derive(Debug, Clone)]
pub struct PathReverser {
	prefix: String,
}

impl PathReverser {
	pub fn new(prefix: impl Into<String>) -> Self {
		let mut prefix = prefix.into();
		if !prefix.ends_with('/') {
			prefix.push('/');
		}
		Self { prefix }
	}
}

impl UrlReverser for PathReverser {
	fn reverse(&self, name: &str, params: &HashMap<String, String>) -> Result<String, String> {
		if let Some(basename) = name.strip_suffix("-detail") {
			let pk = params
				.get("pk")
				.ok_or_else(|| format!("Route `{}` requires a `pk` parameter", name))?;
			Ok(format!("{}{}/{}/", self.prefix, basename, pk))
		} else if let Some(basename) = name.strip_suffix("-list") {
			Ok(format!("{}{}/", self.prefix, basename))
		} else {
			Err(format!("Unknown route `{}`", name))
		}
	}
}

/// The part of an incoming request the engine needs to build links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
	pub scheme: String,
	pub host: String,
	pub path: String,
}

impl RequestContext {
	pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			scheme: "http".to_string(),
			host: host.into(),
			path: path.into(),
		}
	}

	pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.scheme = scheme.into();
		self
	}

	pub fn url(&self) -> String {
		format!("{}://{}{}", self.scheme, self.host, self.path)
	}
}

#[derive(Clone)]
pub struct SerializationContext {
	request: Option<RequestContext>,
	include_disabled: bool,
	reverser: Option<Arc<dyn UrlReverser>>,
	settings: Arc<JsonApiSettings>,
}

impl fmt::Debug for SerializationContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SerializationContext")
			.field("request", &self.request)
			.field("include_disabled", &self.include_disabled)
			.field("reverser", &self.reverser.is_some())
			.field("settings", &self.settings)
			.finish()
	}
}

impl Default for SerializationContext {
	fn default() -> Self {
		Self {
			request: None,
			include_disabled: false,
			reverser: None,
			settings: Arc::new(JsonApiSettings::default()),
		}
	}
}

impl SerializationContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_request(mut self, request: RequestContext) -> Self {
		self.request = Some(request);
		self
	}

	pub fn with_reverser(mut self, reverser: Arc<dyn UrlReverser>) -> Self {
		self.reverser = Some(reverser);
		self
	}

	pub fn with_settings(mut self, settings: Arc<JsonApiSettings>) -> Self {
		self.settings = settings;
		self
	}

	pub fn disable_include(mut self) -> Self {
		self.include_disabled = true;
		self
	}

	pub fn request(&self) -> Option<&RequestContext> {
		self.request.as_ref()
	}

	pub fn settings(&self) -> &Arc<JsonApiSettings> {
		&self.settings
	}

	pub fn is_include_disabled(&self) -> bool {
		self.include_disabled || !self.settings.include_related
	}

	/// Absolute URL of the current request, if there is one.
	pub fn base_url(&self) -> Option<String> {
		self.request.as_ref().map(RequestContext::url)
	}

	/// Reverses `<resource_type>-detail` for `id`.
	///
	/// Reversal failures are logged and yield `None`, so a missing route
	/// only drops a link.
	pub fn detail_url(&self, resource_type: &str, id: &Identifier) -> Option<String> {
		let reverser = self.reverser.as_ref()?;
		let name = format!("{}-detail", resource_type);
		let params = HashMap::from([("pk".to_string(), id.to_string())]);
		match reverser.reverse(&name, &params) {
			Ok(url) => Some(url),
			Err(error) => {
				tracing::warn!("Failed to reverse {}: {}", name, error);
				None
			}
		}
	}

	pub fn list_url(&self, resource_type: &str) -> Option<String> {
		let reverser = self.reverser.as_ref()?;
		let name = format!("{}-list", resource_type);
		reverser
			.reverse(&name, &HashMap::new())
			.map_err(|error| tracing::warn!("Failed to reverse {}: {}", name, error))
			.ok()
	}
}
