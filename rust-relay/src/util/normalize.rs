//! Event name normalization.

/// Canonical form of an event name used for allow-list comparison.
///
/// Lower-cases the input, trims it, and collapses every internal whitespace
/// run to a single space, so `"Workspace  Created"` and `"workspace created"`
/// compare equal.
pub fn normalize_event_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
