//! Testing utilities for the Reinhardt JSON:API engine
//!
//! Provides an in-memory [`MemoryStore`] implementing the record and store
//! traits, and rstest fixtures for the `Test`, `TestIncluded` and
//! `TestIncludedRelation` models.

pub mod fixtures;
pub mod store;

pub use fixtures::{
	FixtureStores, populated_stores, scalar_values, stores, test_definition, test_document,
	test_included_definition, test_included_relation_definition, test_serializer,
};
pub use store::{MemoryRecord, MemoryStore};
