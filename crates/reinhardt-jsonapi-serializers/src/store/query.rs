//! Query description passed to [`RecordStore`](super::RecordStore)
//! implementations.

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison applied by a [`FilterPredicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
	Exact,
	In,
	Range,
	Gt,
	Gte,
	Lt,
	Lte,
	Contains,
	IContains,
	StartsWith,
	EndsWith,
	IsNull,
}

impl Lookup {
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"exact" => Lookup::Exact,
			"in" => Lookup::In,
			"range" => Lookup::Range,
			"gt" => Lookup::Gt,
			"gte" => Lookup::Gte,
			"lt" => Lookup::Lt,
			"lte" => Lookup::Lte,
			"contains" => Lookup::Contains,
			"icontains" => Lookup::IContains,
			"startswith" => Lookup::StartsWith,
			"endswith" => Lookup::EndsWith,
			"isnull" => Lookup::IsNull,
			_ => return None,
		})
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Lookup::Exact => "exact",
			Lookup::In => "in",
			Lookup::Range => "range",
			Lookup::Gt => "gt",
			Lookup::Gte => "gte",
			Lookup::Lt => "lt",
			Lookup::Lte => "lte",
			Lookup::Contains => "contains",
			Lookup::IContains => "icontains",
			Lookup::StartsWith => "startswith",
			Lookup::EndsWith => "endswith",
			Lookup::IsNull => "isnull",
		}
	}
}

impl fmt::Display for Lookup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
	Int(i64),
	Text(String),
	Bool(bool),
	List(Vec<String>),
	Range(String, String),
}

/// One `field__lookup=value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
	pub field: String,
	/// Compare against the related object's id instead of a column value.
	pub through_relation: bool,
	pub lookup: Lookup,
	pub value: FilterValue,
}

impl FilterPredicate {
	pub fn new(field: impl Into<String>, lookup: Lookup, value: FilterValue) -> Self {
		Self {
			field: field.into(),
			through_relation: false,
			lookup,
			value,
		}
	}

	pub fn through_relation(mut self) -> Self {
		self.through_relation = true;
		self
	}

	/// Lookup path in `field__id__lookup` form.
	pub fn path(&self) -> String {
		if self.through_relation {
			format!("{}__id__{}", self.field, self.lookup)
		} else {
			format!("{}__{}", self.field, self.lookup)
		}
	}

	/// Evaluates the predicate against a stored value.
	///
	/// Array candidates match when any element matches, which covers
	/// many-to-many id lists.
	pub fn matches(&self, candidate: &Value) -> bool {
		if self.lookup == Lookup::IsNull {
			let expected = match &self.value {
				FilterValue::Bool(flag) => *flag,
				FilterValue::Int(number) => *number != 0,
				FilterValue::Text(text) => text == "true" || text == "True" || text == "1",
				_ => true,
			};
			let is_null = match candidate {
				Value::Null => true,
				Value::Array(items) => items.is_empty(),
				_ => false,
			};
			return is_null == expected;
		}
		match candidate {
			Value::Array(items) => items.iter().any(|item| self.matches_scalar(item)),
			scalar => self.matches_scalar(scalar),
		}
	}

	fn matches_scalar(&self, candidate: &Value) -> bool {
		if candidate.is_null() {
			return false;
		}
		let text = scalar_text(candidate);
		match (&self.lookup, &self.value) {
			(Lookup::Exact | Lookup::In, FilterValue::List(options)) => {
				options.iter().any(|option| *option == text)
			}
			(Lookup::Exact | Lookup::In, FilterValue::Int(number)) => {
				candidate.as_i64() == Some(*number) || text == number.to_string()
			}
			(Lookup::Exact | Lookup::In, FilterValue::Text(expected)) => text == *expected,
			(Lookup::Exact | Lookup::In, FilterValue::Bool(flag)) => candidate.as_bool() == Some(*flag),
			(Lookup::Range, FilterValue::Range(low, high)) => {
				compare(candidate, low) != Ordering::Less && compare(candidate, high) != Ordering::Greater
			}
			(Lookup::Gt, value) => bound(value).is_some_and(|b| compare(candidate, &b) == Ordering::Greater),
			(Lookup::Gte, value) => bound(value).is_some_and(|b| compare(candidate, &b) != Ordering::Less),
			(Lookup::Lt, value) => bound(value).is_some_and(|b| compare(candidate, &b) == Ordering::Less),
			(Lookup::Lte, value) => bound(value).is_some_and(|b| compare(candidate, &b) != Ordering::Greater),
			(Lookup::Contains, value) => bound(value).is_some_and(|b| text.contains(&b)),
			(Lookup::IContains, value) => {
				bound(value).is_some_and(|b| text.to_lowercase().contains(&b.to_lowercase()))
			}
			(Lookup::StartsWith, value) => bound(value).is_some_and(|b| text.starts_with(&b)),
			(Lookup::EndsWith, value) => bound(value).is_some_and(|b| text.ends_with(&b)),
			_ => false,
		}
	}
}

fn scalar_text(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

fn bound(value: &FilterValue) -> Option<String> {
	match value {
		FilterValue::Int(number) => Some(number.to_string()),
		FilterValue::Text(text) => Some(text.clone()),
		FilterValue::Bool(flag) => Some(flag.to_string()),
		FilterValue::List(items) if items.len() == 1 => items.first().cloned(),
		_ => None,
	}
}

fn compare(candidate: &Value, bound: &str) -> Ordering {
	match (candidate.as_f64(), bound.parse::<f64>()) {
		(Some(left), Ok(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
		_ => scalar_text(candidate).as_str().cmp(bound),
	}
}

/// Filters, ordering and window for a list query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
	pub filters: Vec<FilterPredicate>,
	/// Field names; a leading `-` sorts descending.
	pub order_by: Vec<String>,
	pub limit: Option<usize>,
	pub offset: usize,
}

impl StoreQuery {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn filter(mut self, predicate: FilterPredicate) -> Self {
		self.filters.push(predicate);
		self
	}

	pub fn filters(mut self, predicates: impl IntoIterator<Item = FilterPredicate>) -> Self {
		self.filters.extend(predicates);
		self
	}

	pub fn order_by(mut self, field: impl Into<String>) -> Self {
		self.order_by.push(field.into());
		self
	}

	pub fn window(mut self, limit: usize, offset: usize) -> Self {
		self.limit = Some(limit);
		self.offset = offset;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_in_lookup_matches_string_forms() {
		let predicate = FilterPredicate::new(
			"id",
			Lookup::In,
			FilterValue::List(vec!["1".to_string(), "3".to_string()]),
		);
		assert!(predicate.matches(&json!(1)));
		assert!(!predicate.matches(&json!(2)));
		assert!(predicate.matches(&json!([2, 3])));
	}

	#[rstest]
	fn test_numeric_comparisons() {
		let gt = FilterPredicate::new("int", Lookup::Gt, FilterValue::Int(5));
		assert!(gt.matches(&json!(10)));
		assert!(!gt.matches(&json!(5)));

		let range = FilterPredicate::new(
			"int",
			Lookup::Range,
			FilterValue::Range("2".to_string(), "9".to_string()),
		);
		assert!(range.matches(&json!(2)));
		assert!(range.matches(&json!(9)));
		assert!(!range.matches(&json!(10)));
	}

	#[rstest]
	fn test_text_lookups() {
		let contains = FilterPredicate::new("text", Lookup::IContains, FilterValue::Text("ELL".to_string()));
		assert!(contains.matches(&json!("hello")));
		let starts = FilterPredicate::new("text", Lookup::StartsWith, FilterValue::Text("he".to_string()));
		assert!(starts.matches(&json!("hello")));
		assert!(!starts.matches(&json!(null)));
	}

	#[rstest]
	fn test_isnull_lookup() {
		let predicate = FilterPredicate::new("foreign_key", Lookup::IsNull, FilterValue::Bool(true));
		assert!(predicate.matches(&json!(null)));
		assert!(!predicate.matches(&json!(4)));
	}

	#[rstest]
	fn test_path_through_relation() {
		let predicate = FilterPredicate::new("foreign_key", Lookup::In, FilterValue::List(vec![])).through_relation();
		assert_eq!(predicate.path(), "foreign_key__id__in");
	}
}
