//! Field descriptors
//!
//! A [`FieldDescriptor`] carries everything the engine needs to know about a
//! single attribute or relationship: its kind, whether input must provide it,
//! whether it is written at all, and the validators that run after type
//! coercion. Descriptors are immutable once a resource definition is built,
//! so every validation pass sees the same declaration.

use crate::validator::FieldValidator;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const NULL_MESSAGE: &str = "This field may not be null.";
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// How many related objects a relationship field addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
	Single,
	Multi,
}

/// One allowed value of a choice field.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
	pub value: Value,
	pub label: String,
}

impl Choice {
	pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			label: label.into(),
		}
	}
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
	/// The `type` member of a resource object.
	ResourceType { expected: String },
	/// The `id` member of a resource object.
	ResourceId,
	Char {
		max_length: Option<usize>,
		min_length: Option<usize>,
		allow_blank: bool,
	},
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Float {
		min: Option<f64>,
		max: Option<f64>,
	},
	Boolean,
	Choice {
		choices: Vec<Choice>,
	},
	List {
		child: Box<FieldKind>,
		min_length: Option<usize>,
		max_length: Option<usize>,
	},
	Json,
	/// Read-only value computed by the record.
	Computed,
	Relationship {
		cardinality: Cardinality,
		related_type: Option<String>,
	},
}

/// Failure of a single field validation step.
///
/// Only [`FieldError::Fatal`] aborts a validation pass; the other variants
/// are folded into the aggregated error collection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
	#[error("{}", .0.join(" "))]
	Invalid(Vec<String>),
	/// Errors keyed by a sub-field; recorded as `<field>.<key>`.
	#[error("Invalid nested values: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
	Nested(IndexMap<String, Vec<String>>),
	/// The value could not be read from the input at all.
	#[error("{}", NULL_MESSAGE)]
	Missing,
	/// The field opts out of the current pass.
	#[error("Field skipped")]
	Skip,
	#[error("{0}")]
	Fatal(String),
}

impl FieldError {
	pub fn invalid(message: impl Into<String>) -> Self {
		FieldError::Invalid(vec![message.into()])
	}

	pub fn nested(key: impl Into<String>, message: impl Into<String>) -> Self {
		let mut errors = IndexMap::new();
		errors.insert(key.into(), vec![message.into()]);
		FieldError::Nested(errors)
	}

	pub fn fatal(message: impl Into<String>) -> Self {
		FieldError::Fatal(message.into())
	}

	/// Flattens the error into plain messages, dropping sub-field keys.
	pub fn messages(&self) -> Vec<String> {
		match self {
			FieldError::Invalid(messages) => messages.clone(),
			FieldError::Nested(errors) => errors.values().flatten().cloned().collect(),
			FieldError::Missing => vec![NULL_MESSAGE.to_string()],
			FieldError::Skip => Vec::new(),
			FieldError::Fatal(message) => vec![message.clone()],
		}
	}
}

/// Declaration of one field of a resource.
#[derive(Clone)]
pub struct FieldDescriptor {
	kind: FieldKind,
	required: bool,
	read_only: bool,
	allow_null: bool,
	validators: Vec<Arc<dyn FieldValidator>>,
}

impl fmt::Debug for FieldDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldDescriptor")
			.field("kind", &self.kind)
			.field("required", &self.required)
			.field("read_only", &self.read_only)
			.field("allow_null", &self.allow_null)
			.field("validators", &self.validators.len())
			.finish()
	}
}

impl FieldDescriptor {
	pub fn new(kind: FieldKind) -> Self {
		Self {
			kind,
			required: true,
			read_only: false,
			allow_null: false,
			validators: Vec::new(),
		}
	}

	pub fn resource_type(expected: impl Into<String>) -> Self {
		Self::new(FieldKind::ResourceType {
			expected: expected.into(),
		})
	}

	pub fn resource_id() -> Self {
		Self::new(FieldKind::ResourceId).read_only()
	}

	pub fn char() -> Self {
		Self::new(FieldKind::Char {
			max_length: None,
			min_length: None,
			allow_blank: false,
		})
	}

	pub fn integer() -> Self {
		Self::new(FieldKind::Integer {
			min: None,
			max: None,
		})
	}

	pub fn float() -> Self {
		Self::new(FieldKind::Float {
			min: None,
			max: None,
		})
	}

	pub fn boolean() -> Self {
		Self::new(FieldKind::Boolean)
	}

	pub fn choice(choices: impl IntoIterator<Item = Choice>) -> Self {
		Self::new(FieldKind::Choice {
			choices: choices.into_iter().collect(),
		})
	}

	pub fn list(child: FieldKind) -> Self {
		Self::new(FieldKind::List {
			child: Box::new(child),
			min_length: None,
			max_length: None,
		})
	}

	pub fn json() -> Self {
		Self::new(FieldKind::Json)
	}

	pub fn computed() -> Self {
		Self::new(FieldKind::Computed).read_only()
	}

	pub fn single_relation() -> Self {
		Self::new(FieldKind::Relationship {
			cardinality: Cardinality::Single,
			related_type: None,
		})
	}

	pub fn multi_relation() -> Self {
		Self::new(FieldKind::Relationship {
			cardinality: Cardinality::Multi,
			related_type: None,
		})
	}

	/// Sets the maximum length of a char or list field.
	pub fn max_length(mut self, limit: usize) -> Self {
		match &mut self.kind {
			FieldKind::Char { max_length, .. } | FieldKind::List { max_length, .. } => {
				*max_length = Some(limit)
			}
			_ => {}
		}
		self
	}

	pub fn min_length(mut self, limit: usize) -> Self {
		match &mut self.kind {
			FieldKind::Char { min_length, .. } | FieldKind::List { min_length, .. } => {
				*min_length = Some(limit)
			}
			_ => {}
		}
		self
	}

	pub fn min_value(mut self, limit: i64) -> Self {
		match &mut self.kind {
			FieldKind::Integer { min, .. } => *min = Some(limit),
			FieldKind::Float { min, .. } => *min = Some(limit as f64),
			_ => {}
		}
		self
	}

	pub fn max_value(mut self, limit: i64) -> Self {
		match &mut self.kind {
			FieldKind::Integer { max, .. } => *max = Some(limit),
			FieldKind::Float { max, .. } => *max = Some(limit as f64),
			_ => {}
		}
		self
	}

	pub fn allow_blank(mut self) -> Self {
		if let FieldKind::Char { allow_blank, .. } = &mut self.kind {
			*allow_blank = true;
		}
		self
	}

	/// Sets the resource type expected in relationship linkage.
	pub fn related_type(mut self, resource_type: impl Into<String>) -> Self {
		if let FieldKind::Relationship { related_type, .. } = &mut self.kind {
			*related_type = Some(resource_type.into());
		}
		self
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	pub fn optional(self) -> Self {
		self.required(false)
	}

	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self.required = false;
		self
	}

	pub fn allow_null(mut self) -> Self {
		self.allow_null = true;
		self
	}

	pub fn validator(mut self, validator: Arc<dyn FieldValidator>) -> Self {
		self.validators.push(validator);
		self
	}

	pub fn kind(&self) -> &FieldKind {
		&self.kind
	}

	pub fn is_required(&self) -> bool {
		self.required
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	pub fn allows_null(&self) -> bool {
		self.allow_null
	}

	pub fn validators(&self) -> &[Arc<dyn FieldValidator>] {
		&self.validators
	}

	pub fn cardinality(&self) -> Option<Cardinality> {
		match &self.kind {
			FieldKind::Relationship { cardinality, .. } => Some(*cardinality),
			_ => None,
		}
	}

	pub fn related_resource_type(&self) -> Option<&str> {
		match &self.kind {
			FieldKind::Relationship { related_type, .. } => related_type.as_deref(),
			_ => None,
		}
	}

	pub fn is_relationship(&self) -> bool {
		matches!(self.kind, FieldKind::Relationship { .. })
	}

	/// Coerces a raw input value and runs the attached validators.
	///
	/// Returns the internal value on success.
	pub async fn run_validation(&self, value: &Value) -> Result<Value, FieldError> {
		if value.is_null() {
			return if self.allow_null {
				Ok(Value::Null)
			} else {
				Err(FieldError::invalid(NULL_MESSAGE))
			};
		}
		let internal = coerce(&self.kind, value)?;
		for validator in &self.validators {
			validator.validate(&internal).await?;
		}
		Ok(internal)
	}
}

/// Name of the JSON type of `value`, as used in error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "NoneType",
		Value::Bool(_) => "bool",
		Value::Number(number) if number.is_f64() => "float",
		Value::Number(_) => "int",
		Value::String(_) => "str",
		Value::Array(_) => "list",
		Value::Object(_) => "dict",
	}
}

fn display_input(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

fn coerce(kind: &FieldKind, value: &Value) -> Result<Value, FieldError> {
	match kind {
		FieldKind::ResourceType { expected } => {
			let given = match value {
				Value::String(text) => text.as_str(),
				_ => "",
			};
			if given.is_empty() || given != expected {
				return Err(FieldError::nested(
					"type",
					format!("\"{}\" is not a correct object type.", display_input(value)),
				));
			}
			Ok(Value::String(given.to_string()))
		}
		FieldKind::ResourceId | FieldKind::Computed | FieldKind::Json => Ok(value.clone()),
		FieldKind::Char {
			max_length,
			min_length,
			allow_blank,
		} => coerce_char(value, *max_length, *min_length, *allow_blank),
		FieldKind::Integer { min, max } => coerce_integer(value, *min, *max),
		FieldKind::Float { min, max } => coerce_float(value, *min, *max),
		FieldKind::Boolean => coerce_boolean(value),
		FieldKind::Choice { choices } => choices
			.iter()
			.find(|choice| choice.value == *value || display_input(&choice.value) == display_input(value))
			.map(|choice| choice.value.clone())
			.ok_or_else(|| {
				FieldError::invalid(format!("\"{}\" is not a valid choice.", display_input(value)))
			}),
		FieldKind::List {
			child,
			min_length,
			max_length,
		} => coerce_list(child, value, *min_length, *max_length),
		FieldKind::Relationship { .. } => match value {
			Value::Object(_) => Ok(value.clone()),
			other => Err(FieldError::invalid(format!(
				"Incorrect type. Expected resource identifier object, received {}.",
				type_name(other)
			))),
		},
	}
}

fn coerce_char(
	value: &Value,
	max_length: Option<usize>,
	min_length: Option<usize>,
	allow_blank: bool,
) -> Result<Value, FieldError> {
	let text = match value {
		Value::String(text) => text.clone(),
		Value::Number(number) => number.to_string(),
		_ => return Err(FieldError::invalid("Not a valid string.")),
	};
	if text.is_empty() && !allow_blank {
		return Err(FieldError::invalid("This field may not be blank."));
	}
	let length = text.chars().count();
	if let Some(limit) = max_length
		&& length > limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this field has no more than {} characters.",
			limit
		)));
	}
	if let Some(limit) = min_length
		&& length < limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this field has at least {} characters.",
			limit
		)));
	}
	Ok(Value::String(text))
}

fn coerce_integer(value: &Value, min: Option<i64>, max: Option<i64>) -> Result<Value, FieldError> {
	const MESSAGE: &str = "A valid integer is required.";
	let number = match value {
		Value::Number(number) => match number.as_i64() {
			Some(integer) => integer,
			None => match number.as_f64() {
				Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => float as i64,
				_ => return Err(FieldError::invalid(MESSAGE)),
			},
		},
		Value::String(text) => text
			.trim()
			.parse::<i64>()
			.map_err(|_| FieldError::invalid(MESSAGE))?,
		_ => return Err(FieldError::invalid(MESSAGE)),
	};
	if let Some(limit) = max
		&& number > limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this value is less than or equal to {}.",
			limit
		)));
	}
	if let Some(limit) = min
		&& number < limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this value is greater than or equal to {}.",
			limit
		)));
	}
	Ok(Value::from(number))
}

fn coerce_float(value: &Value, min: Option<f64>, max: Option<f64>) -> Result<Value, FieldError> {
	const MESSAGE: &str = "A valid number is required.";
	let number = match value {
		Value::Number(number) => number.as_f64().ok_or_else(|| FieldError::invalid(MESSAGE))?,
		Value::String(text) => text
			.trim()
			.parse::<f64>()
			.map_err(|_| FieldError::invalid(MESSAGE))?,
		_ => return Err(FieldError::invalid(MESSAGE)),
	};
	if let Some(limit) = max
		&& number > limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this value is less than or equal to {}.",
			limit
		)));
	}
	if let Some(limit) = min
		&& number < limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this value is greater than or equal to {}.",
			limit
		)));
	}
	Number::from_f64(number)
		.map(Value::Number)
		.ok_or_else(|| FieldError::invalid(MESSAGE))
}

fn coerce_boolean(value: &Value) -> Result<Value, FieldError> {
	const TRUE_VALUES: &[&str] = &["t", "y", "yes", "true", "on", "1"];
	const FALSE_VALUES: &[&str] = &["f", "n", "no", "false", "off", "0"];
	match value {
		Value::Bool(flag) => Ok(Value::Bool(*flag)),
		Value::Number(number) => match number.as_i64() {
			Some(1) => Ok(Value::Bool(true)),
			Some(0) => Ok(Value::Bool(false)),
			_ => Err(FieldError::invalid("Must be a valid boolean.")),
		},
		Value::String(text) => {
			let lowered = text.to_lowercase();
			if TRUE_VALUES.contains(&lowered.as_str()) {
				Ok(Value::Bool(true))
			} else if FALSE_VALUES.contains(&lowered.as_str()) {
				Ok(Value::Bool(false))
			} else {
				Err(FieldError::invalid("Must be a valid boolean."))
			}
		}
		_ => Err(FieldError::invalid("Must be a valid boolean.")),
	}
}

fn coerce_list(
	child: &FieldKind,
	value: &Value,
	min_length: Option<usize>,
	max_length: Option<usize>,
) -> Result<Value, FieldError> {
	let items = match value {
		Value::Array(items) => items,
		other => {
			return Err(FieldError::invalid(format!(
				"Expected a list of items but got type \"{}\".",
				type_name(other)
			)));
		}
	};
	if let Some(limit) = max_length
		&& items.len() > limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this field has no more than {} elements.",
			limit
		)));
	}
	if let Some(limit) = min_length
		&& items.len() < limit
	{
		return Err(FieldError::invalid(format!(
			"Ensure this field has at least {} elements.",
			limit
		)));
	}
	let mut coerced = Vec::with_capacity(items.len());
	let mut errors = IndexMap::new();
	for (index, item) in items.iter().enumerate() {
		if item.is_null() {
			errors.insert(index.to_string(), vec![NULL_MESSAGE.to_string()]);
			continue;
		}
		match coerce(child, item) {
			Ok(internal) => coerced.push(internal),
			Err(error) => {
				errors.insert(index.to_string(), error.messages());
			}
		}
	}
	if errors.is_empty() {
		Ok(Value::Array(coerced))
	} else {
		Err(FieldError::Nested(errors))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::validator::sync_validator;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[tokio::test]
	async fn test_char_max_length() {
		let field = FieldDescriptor::char().max_length(3);
		assert_eq!(field.run_validation(&json!("abc")).await, Ok(json!("abc")));
		assert_eq!(
			field.run_validation(&json!("abcd")).await,
			Err(FieldError::invalid(
				"Ensure this field has no more than 3 characters."
			))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_char_rejects_structured_values() {
		let field = FieldDescriptor::char();
		assert_eq!(
			field.run_validation(&json!({"a": 1})).await,
			Err(FieldError::invalid("Not a valid string."))
		);
		assert_eq!(field.run_validation(&json!(12)).await, Ok(json!("12")));
	}

	#[rstest]
	#[case(json!(5), Ok(json!(5)))]
	#[case(json!("7"), Ok(json!(7)))]
	#[case(json!(3.0), Ok(json!(3)))]
	#[case(json!(3.5), Err(FieldError::invalid("A valid integer is required.")))]
	#[case(json!("seven"), Err(FieldError::invalid("A valid integer is required.")))]
	#[case(json!(true), Err(FieldError::invalid("A valid integer is required.")))]
	#[tokio::test]
	async fn test_integer_coercion(#[case] input: Value, #[case] expected: Result<Value, FieldError>) {
		assert_eq!(FieldDescriptor::integer().run_validation(&input).await, expected);
	}

	#[rstest]
	#[case(json!(true), Ok(json!(true)))]
	#[case(json!("false"), Ok(json!(false)))]
	#[case(json!(1), Ok(json!(true)))]
	#[case(json!("maybe"), Err(FieldError::invalid("Must be a valid boolean.")))]
	#[tokio::test]
	async fn test_boolean_coercion(#[case] input: Value, #[case] expected: Result<Value, FieldError>) {
		assert_eq!(FieldDescriptor::boolean().run_validation(&input).await, expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_choice_accepts_string_form_of_key() {
		let field = FieldDescriptor::choice([Choice::new(1, "One"), Choice::new(2, "Two")]);
		assert_eq!(field.run_validation(&json!("2")).await, Ok(json!(2)));
		assert_eq!(
			field.run_validation(&json!(3)).await,
			Err(FieldError::invalid("\"3\" is not a valid choice."))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_list_reports_type_and_size() {
		let field = FieldDescriptor::list(FieldKind::Integer {
			min: None,
			max: None,
		})
		.max_length(2);
		assert_eq!(
			field.run_validation(&json!("1,2")).await,
			Err(FieldError::invalid(
				"Expected a list of items but got type \"str\"."
			))
		);
		assert_eq!(
			field.run_validation(&json!([1, 2, 3])).await,
			Err(FieldError::invalid(
				"Ensure this field has no more than 2 elements."
			))
		);
		assert_eq!(field.run_validation(&json!(["1", 2])).await, Ok(json!([1, 2])));
	}

	#[rstest]
	#[tokio::test]
	async fn test_list_child_errors_are_keyed_by_index() {
		let field = FieldDescriptor::list(FieldKind::Integer {
			min: None,
			max: None,
		});
		let error = field.run_validation(&json!([1, "x"])).await.unwrap_err();
		assert_eq!(error, FieldError::nested("1", "A valid integer is required."));
	}

	#[rstest]
	#[tokio::test]
	async fn test_null_handling() {
		assert_eq!(
			FieldDescriptor::integer().run_validation(&Value::Null).await,
			Err(FieldError::invalid(NULL_MESSAGE))
		);
		assert_eq!(
			FieldDescriptor::integer()
				.allow_null()
				.run_validation(&Value::Null)
				.await,
			Ok(Value::Null)
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_resource_type_mismatch_is_nested_under_type() {
		let field = FieldDescriptor::resource_type("test");
		assert_eq!(field.run_validation(&json!("test")).await, Ok(json!("test")));
		assert_eq!(
			field.run_validation(&json!("other")).await,
			Err(FieldError::nested(
				"type",
				"\"other\" is not a correct object type."
			))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_validators_run_after_coercion() {
		let field = FieldDescriptor::integer().validator(sync_validator(|value: &Value| {
			if value.as_i64() == Some(13) {
				Err(FieldError::invalid("Unlucky."))
			} else {
				Ok(())
			}
		}));
		assert_eq!(
			field.run_validation(&json!("13")).await,
			Err(FieldError::invalid("Unlucky."))
		);
		assert_eq!(field.run_validation(&json!(12)).await, Ok(json!(12)));
	}

	#[rstest]
	fn test_read_only_implies_not_required() {
		let field = FieldDescriptor::char().read_only();
		assert!(field.is_read_only());
		assert!(!field.is_required());
	}
}
