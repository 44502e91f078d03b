//! Citation cross-referencing.
//!
//! Compares the citation keys scanned from a document against the entry ids
//! of a loaded bibliography and reports the keys with no matching entry.

use crate::library::Library;
use crate::markdown::CitationKeySet;

/// Returns the keys in `keys` with no entry of exactly that id in `library`.
///
/// Matching is exact equality only; the result is lexicographically sorted
/// so the textual report is reproducible for a given input pair. Pure
/// function, no I/O.
pub fn missing_entries<'a>(keys: &'a CitationKeySet, library: &Library) -> Vec<&'a str> {
    keys.iter()
        .map(String::as_str)
        .filter(|key| !library.contains(key))
        .collect()
}

/// Renders the cross-reference report.
///
/// An empty list is reported explicitly rather than as a blank line.
pub fn report(missing: &[&str]) -> String {
    if missing.is_empty() {
        "no missing bibliographic entries".to_string()
    } else {
        format!("missing bibliographic entries for:\n{}", missing.join("\n"))
    }
}
