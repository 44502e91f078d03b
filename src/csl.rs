//! Citation style sheets: fetching and caching.
//!
//! Styles are fetched from the Citation Style Language repository
//! (<https://citationstyles.org/>) and cached in a flat directory of
//! `<style>.csl` files keyed by file name.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Raw-content root of the CSL style repository.
pub const CSL_REPOSITORY_URL: &str =
    "https://raw.githubusercontent.com/citation-style-language/styles/master";

/// Body returned by the repository host for a style that does not exist.
const NOT_FOUND_SENTINEL: &str = "404: Not Found";

/// Short aliases accepted in place of full repository style names.
const STYLE_ALIASES: &[(&str, &str)] = &[
    ("mla", "modern-language-association"),
    ("chicago", "chicago-author-date"),
    ("acm", "association-for-computing-machinery"),
    ("acs", "american-chemical-society"),
    ("aaa", "american-anthropological-association"),
    ("apsa", "american-political-science-association"),
];

/// Errors that can occur when fetching a style.
#[derive(Error, Debug)]
pub enum StyleError {
    #[error("no style named '{0}' in the CSL repository")]
    NotFound(String),

    #[error("failed to fetch '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write style file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a user-supplied style name to its repository file stem:
/// lowercased, `.csl` suffix dropped, aliases expanded.
pub fn canonical_style_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stem = lowered.strip_suffix(".csl").unwrap_or(&lowered);
    STYLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == stem)
        .map(|(_, full)| (*full).to_string())
        .unwrap_or_else(|| stem.to_string())
}

/// Source of CSL style definitions.
pub trait StyleSource {
    /// Style text, or `None` when the source has no such style.
    fn fetch(&self, style: &str) -> Result<Option<String>, StyleError>;
}

/// The official CSL style repository, reached over HTTP.
#[derive(Debug, Clone)]
pub struct CslRepository {
    base_url: String,
}

impl CslRepository {
    pub fn new() -> Self {
        Self {
            base_url: CSL_REPOSITORY_URL.to_string(),
        }
    }

    /// Points the repository at a different raw-content root.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for CslRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleSource for CslRepository {
    fn fetch(&self, style: &str) -> Result<Option<String>, StyleError> {
        let url = format!("{}/{}.csl", self.base_url, style);
        tracing::debug!(%url, "fetching style sheet");
        let body = reqwest::blocking::get(&url)
            .and_then(|response| response.text())
            .map_err(|source| StyleError::Http { url, source })?;
        if body.trim() == NOT_FOUND_SENTINEL {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }
}

/// Fetches `name` into the style cache, returning the cached file path.
///
/// An already-cached style is returned without a network round trip unless
/// `update` is set.
pub fn fetch_csl(
    name: &str,
    cache_dir: &Path,
    update: bool,
    source: &dyn StyleSource,
) -> Result<PathBuf, StyleError> {
    let style = canonical_style_name(name);
    let file = cache_dir.join(format!("{style}.csl"));

    if file.is_file() && !update {
        tracing::debug!(path = %file.display(), "style already cached");
        return Ok(file);
    }

    match source.fetch(&style)? {
        Some(text) => {
            fs::create_dir_all(cache_dir).map_err(|source| StyleError::Io {
                path: cache_dir.to_path_buf(),
                source,
            })?;
            fs::write(&file, text).map_err(|source| StyleError::Io {
                path: file.clone(),
                source,
            })?;
            tracing::info!(style = %style, path = %file.display(), "fetched style sheet");
            Ok(file)
        }
        None => Err(StyleError::NotFound(style)),
    }
}
