//! Markdown citation scanning.
//!
//! Extracts `@key` citation keys from Markdown text. The scan splits the
//! document on `@`; every fragment after the first marker is a candidate
//! occurrence, cut at the first whitespace and truncated at the first of the
//! delimiter characters `,` `:` `;` `]`.
//!
//! An `@` that is not a citation (an email address, an `@` inside a code
//! block) is indistinguishable from a real one under this scan. That is a
//! documented boundary of the syntax, not something the scanner tries to
//! special-case.

use std::collections::BTreeSet;

/// Characters that end a citation key after the whitespace cut.
const KEY_DELIMITERS: [char; 4] = [',', ':', ';', ']'];

/// The set of citation keys referenced by one document.
///
/// Ordered so that reports and cross-reference results are deterministic.
pub type CitationKeySet = BTreeSet<String>;

/// Returns a lazy iterator over the citation keys in `markdown`, in document
/// order, duplicates included.
///
/// The iterator borrows the input; calling the function again restarts the
/// scan. Empty candidates (an `@` followed directly by whitespace or a
/// delimiter) are skipped.
///
/// # Examples
///
/// ```
/// use manuscript_tools::markdown::citation_keys;
///
/// let keys: Vec<&str> = citation_keys("see @Doe2020 and @Smith1999]").collect();
/// assert_eq!(keys, vec!["Doe2020", "Smith1999"]);
/// ```
pub fn citation_keys(markdown: &str) -> impl Iterator<Item = &str> {
    markdown.split('@').skip(1).filter_map(|fragment| {
        let head = fragment
            .split(char::is_whitespace)
            .next()
            .unwrap_or(fragment);
        let key = match head.find(|c: char| KEY_DELIMITERS.contains(&c)) {
            Some(end) => &head[..end],
            None => head,
        };
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    })
}

/// Collapses the raw scan into a deterministic, duplicate-free key set.
pub fn citation_key_set(markdown: &str) -> CitationKeySet {
    citation_keys(markdown).map(str::to_owned).collect()
}
