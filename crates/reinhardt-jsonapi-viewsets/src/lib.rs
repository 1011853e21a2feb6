//! # Reinhardt JSON:API ViewSets
//!
//! Resource handlers that sit between a transport and the serialization
//! engine. A [`JsonApiViewSet`] takes an [`ApiRequest`] and produces an
//! [`ApiResponse`]; wiring them to an HTTP server is left to the caller.
//!
//! Routes below the collection path `/<basename>/`:
//!
//! | method | path                               | action              |
//! |--------|------------------------------------|---------------------|
//! | GET    | `/`                                | list                |
//! | POST   | `/`                                | create              |
//! | GET    | `/<pk>/`                           | retrieve            |
//! | PUT    | `/<pk>/`                           | update              |
//! | PATCH  | `/<pk>/`                           | partial update      |
//! | GET    | `/<pk>/relationships/<field>/`     | relationship        |
//! | PUT    | `/<pk>/relationships/<field>/`     | update relationship |
//! | GET    | `/<pk>/<field>/`                   | related (redirect)  |

pub mod action;
pub mod error;
pub mod request;
pub mod viewset;

pub use action::{Action, RouteMiss};
pub use error::{ViewSetError, ViewSetResult};
pub use request::{ApiRequest, ApiResponse};
pub use viewset::JsonApiViewSet;
