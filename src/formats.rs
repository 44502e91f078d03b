//! Supported format tables.
//!
//! The bibliographic formats are a fixed table matched purely by file
//! extension; document and image formats are discovered at runtime by asking
//! the external tools (see [`crate::pandoc`] and [`crate::magick`]).

use std::path::Path;

/// Recognized bibliographic formats: (name, file extension).
///
/// Matching is by extension only; the file content is never sniffed.
pub const BIB_FORMATS: &[(&str, &str)] = &[
    ("BibLaTeX", ".bib"),
    ("BibTeX", ".bibtex"),
    ("Copac", ".copac"),
    ("CSL JSON", ".json"),
    ("CSL YAML", ".yaml"),
    ("EndNote", ".enl"),
    ("ISI", ".wos"),
    ("MEDLINE", ".medline"),
    ("MODS", ".mods"),
    ("RIS", ".ris"),
];

/// Returns the bibliographic format name for a path, if its extension is
/// recognized.
pub fn bib_format_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    BIB_FORMATS
        .iter()
        .find(|(_, e)| e[1..] == ext)
        .map(|(name, _)| *name)
}

/// Whether the path carries a recognized bibliographic extension.
pub fn is_bib_format(path: &Path) -> bool {
    bib_format_for(path).is_some()
}

/// The recognized bibliographic extensions, in table order.
pub fn bib_extensions() -> Vec<&'static str> {
    BIB_FORMATS.iter().map(|(_, ext)| *ext).collect()
}

/// Default file extension used when naming the output of a document
/// conversion, keyed by Pandoc format name.
pub fn default_extension(format: &str) -> &'static str {
    match format {
        "commonmark" | "gfm" | "markdown" | "markdown_github" | "markdown_mmd"
        | "markdown_phpextra" | "markdown_strict" => ".md",
        "docbook" | "docbook4" | "docbook5" => ".dbk",
        "docx" => ".docx",
        "epub" | "epub2" | "epub3" => ".epub",
        "fb2" | "jats" | "icml" | "opendocument" => ".xml",
        "haddock" | "native" => ".hs",
        "html" | "dzslides" | "html4" | "html5" | "revealjs" | "s5" | "slideous" | "slidy" => {
            ".html"
        }
        "ipynb" => ".ipynb",
        "json" => ".json",
        "latex" | "beamer" | "context" => ".tex",
        "odt" => ".odt",
        "opml" => ".opml",
        "org" => ".org",
        "pdf" => ".pdf",
        "pptx" => ".pptx",
        "rst" => ".rst",
        "rtf" => ".rtf",
        "texinfo" => ".texinfo",
        "textile" => ".textile",
        _ => ".txt",
    }
}
