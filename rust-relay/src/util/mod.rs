//! Small shared helpers.

pub mod normalize;

pub use normalize::normalize_event_name;
