//! YAML front-matter embedding.
//!
//! Splices a bibliography-derived YAML payload into the first metadata block
//! of a document, or synthesizes a block when the document has none. Only the
//! first delimiter pair is treated as the metadata block; later pairs pass
//! through untouched.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while embedding bibliography metadata.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("document not found: '{0}'")]
    FileNotFound(PathBuf),

    #[error("bibliography YAML is not usable: {0}")]
    InvalidBibliographyYaml(String),

    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Opens a metadata block.
const BLOCK_OPEN: &str = "---";
/// Closes a metadata block (the opener is also accepted as a closer).
const BLOCK_CLOSE: &str = "...";
/// Metadata key controlled by the embed operation.
const LINK_CITATIONS_KEY: &str = "link-citations:";

/// Line-oriented splice state over the document.
enum SpliceState {
    BeforeBlock,
    InBlock,
    AfterBlock,
}

/// Embeds `bib_yaml` into `document`.
///
/// With a document, the payload is inserted just before the closing
/// delimiter of the first metadata block; any `link-citations` line inside
/// that block is extracted and rewritten from `link_citations`, and every
/// other block line is preserved verbatim. A document without a complete
/// delimiter pair gets a brand-new block prepended, followed by the original
/// text unchanged.
///
/// Without a document, the result is a standalone YAML document.
///
/// Fails with [`MetadataError::InvalidBibliographyYaml`] when the payload is
/// empty or does not parse as YAML.
pub fn embed_bibliography(
    bib_yaml: &str,
    link_citations: bool,
    document: Option<&str>,
) -> Result<String, MetadataError> {
    validate_payload(bib_yaml)?;
    Ok(match document {
        Some(text) => splice(bib_yaml, link_citations, text),
        None => standalone_block(bib_yaml, link_citations),
    })
}

/// Embeds `bib_yaml` into the document at `path`, rewriting it in place.
pub fn embed_into_file(
    bib_yaml: &str,
    link_citations: bool,
    path: &Path,
) -> Result<(), MetadataError> {
    let text = fs::read_to_string(path)
        .map_err(|_| MetadataError::FileNotFound(path.to_path_buf()))?;
    let spliced = embed_bibliography(bib_yaml, link_citations, Some(&text))?;
    fs::write(path, spliced).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a standalone YAML document for `bib_yaml` at `path`.
pub fn write_standalone(
    bib_yaml: &str,
    link_citations: bool,
    path: &Path,
) -> Result<(), MetadataError> {
    let text = embed_bibliography(bib_yaml, link_citations, None)?;
    fs::write(path, text).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Strips the delimiter lines from a YAML metadata block, leaving its body.
///
/// `pandoc-citeproc --bib2yaml` emits a complete block (`---` ... `...`);
/// the splicer wants only the body.
pub fn yaml_block_body(block: &str) -> String {
    let lines: Vec<&str> = block
        .split('\n')
        .filter(|line| {
            let t = line.trim();
            t != BLOCK_OPEN && t != BLOCK_CLOSE
        })
        .collect();
    lines.join("\n")
}

fn validate_payload(bib_yaml: &str) -> Result<(), MetadataError> {
    if bib_yaml.trim().is_empty() {
        return Err(MetadataError::InvalidBibliographyYaml(
            "empty payload".to_string(),
        ));
    }
    serde_yaml::from_str::<serde_yaml::Value>(bib_yaml)
        .map(|_| ())
        .map_err(|e| MetadataError::InvalidBibliographyYaml(e.to_string()))
}

/// Whether the text contains a complete first metadata block: a `---` line
/// later closed by `---` or `...`.
fn has_front_matter(text: &str) -> bool {
    let mut open = false;
    for line in text.split('\n') {
        let t = line.trim();
        if open && (t == BLOCK_OPEN || t == BLOCK_CLOSE) {
            return true;
        }
        if t == BLOCK_OPEN {
            open = true;
        }
    }
    false
}

fn splice(bib_yaml: &str, link_citations: bool, text: &str) -> String {
    if !has_front_matter(text) {
        return prepend_block(bib_yaml, link_citations, text);
    }

    let mut out: Vec<String> = Vec::new();
    let mut state = SpliceState::BeforeBlock;

    for line in text.split('\n') {
        let trimmed = line.trim();
        match state {
            SpliceState::BeforeBlock => {
                out.push(line.to_string());
                if trimmed == BLOCK_OPEN {
                    state = SpliceState::InBlock;
                }
            }
            SpliceState::InBlock => {
                if trimmed == BLOCK_OPEN || trimmed == BLOCK_CLOSE {
                    out.push(format!("{} {}", LINK_CITATIONS_KEY, link_citations));
                    for payload_line in bib_yaml.trim_end_matches('\n').split('\n') {
                        out.push(payload_line.to_string());
                    }
                    out.push(line.to_string());
                    state = SpliceState::AfterBlock;
                } else if trimmed.starts_with(LINK_CITATIONS_KEY) {
                    // extracted; rewritten next to the payload
                } else {
                    out.push(line.to_string());
                }
            }
            SpliceState::AfterBlock => out.push(line.to_string()),
        }
    }

    out.join("\n")
}

/// Synthesizes a new metadata block ahead of a document that has none.
fn prepend_block(bib_yaml: &str, link_citations: bool, text: &str) -> String {
    let mut out = String::new();
    out.push_str(BLOCK_OPEN);
    out.push('\n');
    if link_citations {
        out.push_str(LINK_CITATIONS_KEY);
        out.push_str(" true\n");
    }
    out.push_str(bib_yaml.trim_end_matches('\n'));
    out.push('\n');
    out.push_str(BLOCK_CLOSE);
    out.push('\n');
    out.push_str(text);
    out
}

/// A standalone YAML document carrying only the bibliography metadata.
fn standalone_block(bib_yaml: &str, link_citations: bool) -> String {
    // same layout as the synthesized block, without trailing document text
    prepend_block(bib_yaml, link_citations, "")
}
