//! Mapping of method and path onto viewset actions

use http::Method;
use reinhardt_jsonapi_serializers::Identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	List,
	Create,
	Retrieve(Identifier),
	Update(Identifier),
	PartialUpdate(Identifier),
	/// `GET <pk>/relationships/<field>/`
	Relationship { id: Identifier, field: String },
	/// `PUT <pk>/relationships/<field>/`
	UpdateRelationship { id: Identifier, field: String },
	/// `GET <pk>/<field>/`
	Related { id: Identifier, field: String },
}

/// Why a path could not be mapped to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMiss {
	NoRoute,
	MethodNotAllowed,
}

impl Action {
	/// Resolves `path` relative to the collection prefix, e.g. `/test/`.
	pub fn resolve(method: &Method, prefix: &str, path: &str) -> Result<Self, RouteMiss> {
		let rest = path.strip_prefix(prefix).ok_or(RouteMiss::NoRoute)?;
		let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
		let action = match segments.as_slice() {
			[] => match *method {
				Method::GET => Action::List,
				Method::POST => Action::Create,
				_ => return Err(RouteMiss::MethodNotAllowed),
			},
			[pk] => {
				let id = Identifier::parse(pk).ok_or(RouteMiss::NoRoute)?;
				match *method {
					Method::GET => Action::Retrieve(id),
					Method::PUT => Action::Update(id),
					Method::PATCH => Action::PartialUpdate(id),
					_ => return Err(RouteMiss::MethodNotAllowed),
				}
			}
			[pk, "relationships", field] => {
				let id = Identifier::parse(pk).ok_or(RouteMiss::NoRoute)?;
				let field = field.to_string();
				match *method {
					Method::GET => Action::Relationship { id, field },
					Method::PUT => Action::UpdateRelationship { id, field },
					_ => return Err(RouteMiss::MethodNotAllowed),
				}
			}
			[pk, field] => {
				let id = Identifier::parse(pk).ok_or(RouteMiss::NoRoute)?;
				match *method {
					Method::GET => Action::Related {
						id,
						field: field.to_string(),
					},
					_ => return Err(RouteMiss::MethodNotAllowed),
				}
			}
			_ => return Err(RouteMiss::NoRoute),
		};
		Ok(action)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Method::GET, "/test/", Ok(Action::List))]
	#[case(Method::POST, "/test/", Ok(Action::Create))]
	#[case(Method::GET, "/test/3/", Ok(Action::Retrieve(Identifier::Int(3))))]
	#[case(Method::PATCH, "/test/3/", Ok(Action::PartialUpdate(Identifier::Int(3))))]
	#[case(
		Method::PUT,
		"/test/3/relationships/foreign_key/",
		Ok(Action::UpdateRelationship { id: Identifier::Int(3), field: "foreign_key".to_string() })
	)]
	#[case(
		Method::GET,
		"/test/3/many_to_many/",
		Ok(Action::Related { id: Identifier::Int(3), field: "many_to_many".to_string() })
	)]
	#[case(Method::DELETE, "/test/3/", Err(RouteMiss::MethodNotAllowed))]
	#[case(Method::GET, "/other/", Err(RouteMiss::NoRoute))]
	#[case(Method::GET, "/test/1/a/b/c/", Err(RouteMiss::NoRoute))]
	fn test_resolve(
		#[case] method: Method,
		#[case] path: &str,
		#[case] expected: Result<Action, RouteMiss>,
	) {
		assert_eq!(Action::resolve(&method, "/test/", path), expected);
	}
}
