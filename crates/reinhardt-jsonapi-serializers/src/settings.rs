//! JSON:API engine settings
//!
//! Settings are plain data loaded from TOML and optionally overridden from
//! environment variables prefixed with [`ENV_PREFIX`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const ENV_PREFIX: &str = "JSONAPI_";

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid value for {key}: {value}")]
	InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonApiSettings {
	/// Reported in the `jsonapi.version` member of error documents.
	pub version: String,
	/// Status code attached to every formatted error.
	pub error_code: u16,
	pub url_field_name: String,
	pub default_page_limit: usize,
	pub max_page_limit: Option<usize>,
	/// Global switch for populating `included`.
	pub include_related: bool,
}

impl Default for JsonApiSettings {
	fn default() -> Self {
		Self {
			version: "1.1".to_string(),
			error_code: 403,
			url_field_name: "links".to_string(),
			default_page_limit: 100,
			max_page_limit: None,
			include_related: true,
		}
	}
}

impl JsonApiSettings {
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path.as_ref())?;
		tracing::debug!("Loaded JSON:API settings from {}", path.as_ref().display());
		Self::from_toml_str(&content)
	}

	/// Applies `JSONAPI_*` variables from the process environment.
	pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
		self.with_overrides(std::env::vars(), ENV_PREFIX)
	}

	/// Applies overrides from `(name, value)` pairs whose names start with
	/// `prefix`. Unknown names are ignored.
	pub fn with_overrides<I>(mut self, vars: I, prefix: &str) -> Result<Self, SettingsError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (name, value) in vars {
			let Some(key) = name.strip_prefix(prefix) else {
				continue;
			};
			let key = key.to_lowercase();
			match key.as_str() {
				"version" => self.version = value,
				"error_code" => self.error_code = parse(&key, &value)?,
				"url_field_name" => self.url_field_name = value,
				"default_page_limit" => self.default_page_limit = parse(&key, &value)?,
				"max_page_limit" => {
					self.max_page_limit = if value.is_empty() {
						None
					} else {
						Some(parse(&key, &value)?)
					}
				}
				"include_related" => {
					self.include_related = match value.to_lowercase().as_str() {
						"1" | "true" | "yes" | "on" => true,
						"0" | "false" | "no" | "off" => false,
						_ => {
							return Err(SettingsError::InvalidValue {
								key: key.clone(),
								value,
							});
						}
					}
				}
				_ => {
					tracing::trace!("Ignoring unknown setting override {}", name);
				}
			}
		}
		Ok(self)
	}
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
	value.parse().map_err(|_| SettingsError::InvalidValue {
		key: key.to_string(),
		value: value.to_string(),
	})
}
