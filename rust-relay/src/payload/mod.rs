//! Inbound webhook payload access.
//!
//! Coder webhook bodies have no enforced schema. This module provides:
//! - Optional-field accessors over `serde_json::Value`
//! - The configurable path layout used to locate each field
//!
//! Every lookup returns `None` for a missing or mistyped field instead of
//! failing, so an unusual payload degrades to absent values.

pub mod fields;
pub mod schema;

pub use fields::{lookup, lookup_str, lookup_timestamp};
pub use schema::{PayloadSchema, SchemaVariant};
