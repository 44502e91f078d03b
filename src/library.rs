//! Bibliography entries and library loading.
//!
//! A [`Library`] is an ordered, immutable list of [`Entry`] records parsed
//! from the CSL-JSON text an external converter produces for a bibliography
//! file. The loader recognizes bibliography files by extension only and
//! applies two normalizations at parse time: comma-joined `keyword` fields
//! are split into a set, and the nested `issued.date-parts` structure is
//! reduced to a plain year.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::formats;
use crate::runner::RunnerError;

/// Errors that can occur when loading a bibliography.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("bibliography file not found: '{0}'")]
    FileNotFound(PathBuf),

    #[error("unsupported bibliography format: '{0}' (recognized extensions: {1})")]
    UnsupportedFormat(PathBuf, String),

    #[error("bibliography converter produced invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("bibliography record {index} has no 'id' field")]
    MissingId { index: usize },

    #[error(transparent)]
    Converter(#[from] RunnerError),
}

/// Normalizes a bibliography file into structured text via an external tool.
///
/// Implemented by [`crate::pandoc::Citeproc`] for production; tests supply
/// fakes that return canned text.
pub trait BibConverter {
    /// The file's records as a CSL-JSON array.
    fn bib_to_json(&self, path: &Path) -> Result<String, RunnerError>;

    /// The file's records as a YAML metadata block.
    fn bib_to_yaml(&self, path: &Path) -> Result<String, RunnerError>;
}

/// One author of a bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub given: String,
    #[serde(default)]
    pub family: String,
}

/// One bibliographic record.
///
/// Only the fields below carry special semantics; everything else the
/// converter emitted is preserved untyped in [`Entry::extra`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Unique key used for `@key` matching.
    pub id: String,
    title: Option<String>,
    container_title: Option<String>,
    pub authors: Vec<Author>,
    /// Publication year from `issued.date-parts[0][0]`; absent when the
    /// record has no `issued` field of that shape.
    pub year: Option<i64>,
    /// Keywords split from the comma-joined `keyword` source field.
    pub keywords: BTreeSet<String>,
    /// Remaining fields, preserved as generic JSON values.
    pub extra: BTreeMap<String, Value>,
}

impl Entry {
    /// Display title. `container-title` takes precedence over `title` when
    /// both are present, matching how journal-article records are titled.
    pub fn title(&self) -> Option<&str> {
        self.container_title.as_deref().or(self.title.as_deref())
    }

    /// Authors rendered as `"Given Family and Given Family"`.
    pub fn authors_line(&self) -> String {
        self.authors
            .iter()
            .map(|a| format!("{} {}", a.given, a.family).trim().to_string())
            .collect::<Vec<_>>()
            .join(" and ")
    }

    fn from_record(index: usize, record: &Value) -> Result<Entry, LibraryError> {
        let id = match record.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(LibraryError::MissingId { index }),
        };

        let title = record
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        let container_title = record
            .get("container-title")
            .and_then(Value::as_str)
            .map(str::to_string);

        let authors = record
            .get("author")
            .cloned()
            .map(serde_json::from_value::<Vec<Author>>)
            .transpose()
            .unwrap_or_default()
            .unwrap_or_default();

        let year = record
            .get("issued")
            .and_then(|issued| issued.get("date-parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|first| first.get(0))
            .and_then(Value::as_i64);

        let keywords = record
            .get("keyword")
            .and_then(Value::as_str)
            .map(|joined| {
                joined
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let special = [
            "id",
            "title",
            "container-title",
            "author",
            "issued",
            "keyword",
        ];
        let extra = record
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(k, _)| !special.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Entry {
            id,
            title,
            container_title,
            authors,
            year,
            keywords,
            extra,
        })
    }
}

/// An ordered, immutable collection of bibliography entries.
#[derive(Debug, Clone, Default)]
pub struct Library {
    entries: Vec<Entry>,
}

impl Library {
    /// Loads a bibliography file.
    ///
    /// The extension must belong to the recognized format table; the actual
    /// format conversion is delegated to `converter`.
    pub fn load(path: &Path, converter: &dyn BibConverter) -> Result<Library, LibraryError> {
        if !formats::is_bib_format(path) {
            return Err(LibraryError::UnsupportedFormat(
                path.to_path_buf(),
                formats::bib_extensions().join(" "),
            ));
        }
        if !path.is_file() {
            return Err(LibraryError::FileNotFound(path.to_path_buf()));
        }

        let json = converter.bib_to_json(path)?;
        let library = Library::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            entries = library.len(),
            "loaded bibliography"
        );
        Ok(library)
    }

    /// Parses a CSL-JSON array into a library.
    pub fn from_json(json: &str) -> Result<Library, LibraryError> {
        let records: Vec<Value> = serde_json::from_str(json)?;
        let entries = records
            .iter()
            .enumerate()
            .map(|(index, record)| Entry::from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        // Duplicate ids are not an error: the first entry wins everywhere,
        // but each duplicate is worth a warning.
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                tracing::warn!(id = %entry.id, "duplicate bibliography id; first entry wins");
            }
        }

        Ok(Library { entries })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose id equals `id` exactly.
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}
