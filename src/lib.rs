//! manuscript-tools: CLI toolkit for converting manuscripts and
//! cross-referencing citations via Pandoc and ImageMagick.
//!
//! This library provides functionality to:
//! - Scan `@key` citations from Markdown documents
//! - Load bibliographies through an external normalize-to-JSON step
//! - Cross-reference citation keys against bibliography entries
//! - Splice bibliography-derived YAML metadata into document front matter
//! - Build argument lists for and invoke Pandoc, pandoc-citeproc and
//!   ImageMagick
//! - Fetch and cache Citation Style Language style sheets

pub mod csl;
pub mod formats;
pub mod library;
pub mod magick;
pub mod markdown;
pub mod metadata;
pub mod pandoc;
pub mod runner;
pub mod xref;

pub use csl::{canonical_style_name, fetch_csl, CslRepository, StyleSource};
pub use library::{Author, BibConverter, Entry, Library, LibraryError};
pub use markdown::{citation_key_set, citation_keys, CitationKeySet};
pub use metadata::{embed_bibliography, embed_into_file, yaml_block_body, MetadataError};
pub use runner::{CommandRunner, RunOutput, SystemRunner};
pub use xref::{missing_entries, report};
