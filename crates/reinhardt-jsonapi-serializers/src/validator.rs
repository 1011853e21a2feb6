//! Validator and hook seams
//!
//! Validators inspect a coerced value and either accept it or raise a
//! [`FieldError`]. Hooks run after validation of a single field and may
//! replace its value, mirroring per-field `validate_<name>` methods.

use crate::fields::FieldError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Checks a single value.
#[async_trait]
pub trait FieldValidator: Send + Sync {
	async fn validate(&self, value: &Value) -> Result<(), FieldError>;
}

/// Per-field hook, invoked with the validated value.
#[async_trait]
pub trait FieldHook: Send + Sync {
	async fn call(&self, value: Value) -> Result<Value, FieldError>;
}

/// Wraps a synchronous closure as a [`FieldValidator`].
pub struct FnValidator<F>(F);

#[async_trait]
impl<F> FieldValidator for FnValidator<F>
where
	F: Fn(&Value) -> Result<(), FieldError> + Send + Sync,
{
	async fn validate(&self, value: &Value) -> Result<(), FieldError> {
		(self.0)(value)
	}
}

pub fn sync_validator<F>(f: F) -> Arc<dyn FieldValidator>
where
	F: Fn(&Value) -> Result<(), FieldError> + Send + Sync + 'static,
{
	Arc::new(FnValidator(f))
}

/// Wraps a synchronous closure as a [`FieldHook`].
pub struct FnHook<F>(F);

#[async_trait]
impl<F> FieldHook for FnHook<F>
where
	F: Fn(Value) -> Result<Value, FieldError> + Send + Sync,
{
	async fn call(&self, value: Value) -> Result<Value, FieldError> {
		(self.0)(value)
	}
}

/// Wraps a closure returning a boxed future as a [`FieldHook`].
pub struct AsyncFnHook<F>(F);

#[async_trait]
impl<F> FieldHook for AsyncFnHook<F>
where
	F: Fn(Value) -> BoxFuture<'static, Result<Value, FieldError>> + Send + Sync,
{
	async fn call(&self, value: Value) -> Result<Value, FieldError> {
		(self.0)(value).await
	}
}

pub fn sync_hook<F>(f: F) -> Arc<dyn FieldHook>
where
	F: Fn(Value) -> Result<Value, FieldError> + Send + Sync + 'static,
{
	Arc::new(FnHook(f))
}

/// Builds a hook from an async closure.
///
/// # Examples
///
/// ```
/// use futures::FutureExt;
/// use reinhardt_jsonapi_serializers::validator::async_hook;
///
/// let hook = async_hook(|value| async move { Ok(value) }.boxed());
/// # let _ = hook;
/// ```
pub fn async_hook<F>(f: F) -> Arc<dyn FieldHook>
where
	F: Fn(Value) -> BoxFuture<'static, Result<Value, FieldError>> + Send + Sync + 'static,
{
	Arc::new(AsyncFnHook(f))
}

fn measured_length(value: &Value) -> Option<usize> {
	match value {
		Value::String(text) => Some(text.chars().count()),
		Value::Array(items) => Some(items.len()),
		Value::Object(map) => Some(map.len()),
		_ => None,
	}
}

#[derive(Debug, Clone)]
pub struct MaxLengthValidator {
	limit: usize,
}

impl MaxLengthValidator {
	pub fn new(limit: usize) -> Self {
		Self { limit }
	}
}

#[async_trait]
impl FieldValidator for MaxLengthValidator {
	async fn validate(&self, value: &Value) -> Result<(), FieldError> {
		match measured_length(value) {
			Some(length) if length > self.limit => Err(FieldError::invalid(format!(
				"Ensure this value has at most {} characters (it has {}).",
				self.limit, length
			))),
			_ => Ok(()),
		}
	}
}

#[derive(Debug, Clone)]
pub struct MinLengthValidator {
	limit: usize,
}

impl MinLengthValidator {
	pub fn new(limit: usize) -> Self {
		Self { limit }
	}
}

#[async_trait]
impl FieldValidator for MinLengthValidator {
	async fn validate(&self, value: &Value) -> Result<(), FieldError> {
		match measured_length(value) {
			Some(length) if length < self.limit => Err(FieldError::invalid(format!(
				"Ensure this value has at least {} characters (it has {}).",
				self.limit, length
			))),
			_ => Ok(()),
		}
	}
}

#[derive(Debug, Clone)]
pub struct MaxValueValidator {
	limit: f64,
}

impl MaxValueValidator {
	pub fn new(limit: impl Into<f64>) -> Self {
		Self {
			limit: limit.into(),
		}
	}
}

#[async_trait]
impl FieldValidator for MaxValueValidator {
	async fn validate(&self, value: &Value) -> Result<(), FieldError> {
		match value.as_f64() {
			Some(number) if number > self.limit => Err(FieldError::invalid(format!(
				"Ensure this value is less than or equal to {}.",
				self.limit
			))),
			_ => Ok(()),
		}
	}
}

#[derive(Debug, Clone)]
pub struct MinValueValidator {
	limit: f64,
}

impl MinValueValidator {
	pub fn new(limit: impl Into<f64>) -> Self {
		Self {
			limit: limit.into(),
		}
	}
}

#[async_trait]
impl FieldValidator for MinValueValidator {
	async fn validate(&self, value: &Value) -> Result<(), FieldError> {
		match value.as_f64() {
			Some(number) if number < self.limit => Err(FieldError::invalid(format!(
				"Ensure this value is greater than or equal to {}.",
				self.limit
			))),
			_ => Ok(()),
		}
	}
}

/// Requires string values to match a pattern.
#[derive(Debug, Clone)]
pub struct RegexValidator {
	pattern: Regex,
	message: String,
}

impl RegexValidator {
	pub fn new(pattern: &str) -> Result<Self, regex::Error> {
		Ok(Self {
			pattern: Regex::new(pattern)?,
			message: "Enter a valid value.".to_string(),
		})
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}
}

#[async_trait]
impl FieldValidator for RegexValidator {
	async fn validate(&self, value: &Value) -> Result<(), FieldError> {
		match value {
			Value::String(text) if !self.pattern.is_match(text) => {
				Err(FieldError::invalid(self.message.clone()))
			}
			_ => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[tokio::test]
	async fn test_max_length_validator() {
		let validator = MaxLengthValidator::new(4);
		assert!(validator.validate(&json!("abcd")).await.is_ok());
		assert_eq!(
			validator.validate(&json!("abcde")).await,
			Err(FieldError::invalid(
				"Ensure this value has at most 4 characters (it has 5)."
			))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_max_value_validator_ignores_non_numbers() {
		let validator = MaxValueValidator::new(0);
		assert!(validator.validate(&json!("12")).await.is_ok());
		assert_eq!(
			validator.validate(&json!(1)).await,
			Err(FieldError::invalid("Ensure this value is less than or equal to 0."))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_regex_validator() {
		let validator = RegexValidator::new(r"^[a-z]+$")
			.unwrap()
			.with_message("Lowercase letters only.");
		assert!(validator.validate(&json!("abc")).await.is_ok());
		assert_eq!(
			validator.validate(&json!("ABC")).await,
			Err(FieldError::invalid("Lowercase letters only."))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_hooks_can_rewrite_values() {
		let upper = sync_hook(|value: Value| {
			Ok(Value::String(
				value.as_str().unwrap_or_default().to_uppercase(),
			))
		});
		assert_eq!(upper.call(json!("abc")).await, Ok(json!("ABC")));

		let skip = async_hook(|_value| async move { Err(FieldError::Skip) }.boxed());
		assert_eq!(skip.call(json!(1)).await, Err(FieldError::Skip));
	}
}
