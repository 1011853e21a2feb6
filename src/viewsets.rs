//! ViewSets module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reinhardt_jsonapi::viewsets::ApiRequest;
//!
//! let request = ApiRequest::get("testserver", "/article/?filter[id]=1,2").unwrap();
//! assert_eq!(request.query["filter[id]"], "1,2");
//! ```

pub use reinhardt_jsonapi_viewsets::*;
