//! Pandoc and pandoc-citeproc invocation.
//!
//! Builds argument lists for the external tools, runs them through the
//! injected [`CommandRunner`], and scrapes their line-oriented text output.
//! Nothing here re-implements conversion; the wrapper's job is argument
//! construction and output scraping.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::formats;
use crate::library::BibConverter;
use crate::runner::{CommandRunner, RunnerError};

/// Default Pandoc executable name.
pub const PANDOC_EXE: &str = "pandoc";
/// Default pandoc-citeproc executable name.
pub const CITEPROC_EXE: &str = "pandoc-citeproc";

/// PDF engines Pandoc accepts for `--pdf-engine`.
pub const PDF_ENGINES: &[&str] = &[
    "pdflatex",
    "lualatex",
    "xelatex",
    "wkhtmltopdf",
    "weasyprint",
    "prince",
    "context",
    "pdfroff",
];

/// Errors from the document-conversion wrappers.
#[derive(Error, Debug)]
pub enum PandocError {
    #[error("input file not found: '{0}'")]
    FileNotFound(PathBuf),

    #[error("unsupported document format: '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to move extracted media '{path}': {source}")]
    Media {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tool(#[from] RunnerError),
}

/// Citation rendering configuration for a conversion.
#[derive(Debug, Clone, Default)]
pub struct CitationOptions {
    pub bibliography: Option<PathBuf>,
    pub csl: Option<PathBuf>,
}

/// Options shared by the document conversion commands.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub verbose: bool,
    /// Output resolution in pixels per inch; 96 is Pandoc's default and is
    /// not passed explicitly.
    pub ppi: u32,
    pub pdf_engine: String,
    /// Table of contents depth; 0 disables the TOC.
    pub toc_depth: u8,
    /// ATX headers for markdown-family and asciidoc outputs.
    pub atx_headers: bool,
    /// Preserve tabs in literal code blocks instead of expanding them.
    pub preserve_tabs: bool,
    pub citations: Option<CitationOptions>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            ppi: 96,
            pdf_engine: "pdflatex".to_string(),
            toc_depth: 0,
            atx_headers: false,
            preserve_tabs: false,
            citations: None,
        }
    }
}

/// Wrapper around the Pandoc executable.
pub struct Pandoc<'r> {
    runner: &'r dyn CommandRunner,
    exe: String,
}

impl<'r> Pandoc<'r> {
    pub fn new(runner: &'r dyn CommandRunner) -> Self {
        Self::with_exe(runner, PANDOC_EXE)
    }

    pub fn with_exe(runner: &'r dyn CommandRunner, exe: impl Into<String>) -> Self {
        Self {
            runner,
            exe: exe.into(),
        }
    }

    /// `pandoc --version` output.
    pub fn version(&self) -> Result<String, PandocError> {
        let output = self.runner.run_checked(&self.exe, &["--version"])?;
        Ok(output.stdout)
    }

    /// Formats Pandoc can read.
    pub fn input_formats(&self) -> Result<Vec<String>, PandocError> {
        let output = self.runner.run_checked(&self.exe, &["--list-input-formats"])?;
        Ok(nonempty_lines(&output.stdout))
    }

    /// Formats Pandoc can write, plus `pdf` which Pandoc produces via a PDF
    /// engine rather than a writer.
    pub fn output_formats(&self) -> Result<Vec<String>, PandocError> {
        let output = self.runner.run_checked(&self.exe, &["--list-output-formats"])?;
        let mut formats = vec!["pdf".to_string()];
        formats.extend(nonempty_lines(&output.stdout));
        Ok(formats)
    }

    /// Installed Pandoc extensions (the `+`-prefixed listing lines).
    pub fn extensions(&self) -> Result<Vec<String>, PandocError> {
        let output = self.runner.run_checked(&self.exe, &["--list-extensions"])?;
        Ok(output
            .stdout
            .lines()
            .filter_map(|line| line.trim().strip_prefix('+'))
            .map(str::to_string)
            .collect())
    }

    /// Converts `input` from `read` to `write`, deriving the output path from
    /// the target format's default extension. Returns the output path.
    pub fn convert_document(
        &self,
        opts: &ConvertOptions,
        read: &str,
        write: &str,
        input: &Path,
        extra_args: &[String],
    ) -> Result<PathBuf, PandocError> {
        let read = read.to_lowercase();
        let write = write.to_lowercase();

        if !input.is_file() {
            return Err(PandocError::FileNotFound(input.to_path_buf()));
        }
        if !self.input_formats()?.contains(&read) {
            return Err(PandocError::UnsupportedFormat(read));
        }
        if !self.output_formats()?.contains(&write) {
            return Err(PandocError::UnsupportedFormat(write));
        }

        let output = input.with_extension(&formats::default_extension(&write)[1..]);
        let args = build_convert_args(opts, &read, &write, input, &output, extra_args);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            read = %read,
            write = %write,
            "converting document"
        );
        self.runner.run_checked(&self.exe, &arg_refs)?;
        Ok(output)
    }

    /// Extracts media from `input` into the document's directory.
    ///
    /// Pandoc drops media into a `media/` scratch directory and logs one
    /// `Extracting <path>..` line per file. The extracted files are renamed
    /// to `<source-stem>_<name>`, moved next to the document, and the
    /// scratch directory is removed. Returns the final paths.
    pub fn extract_media(&self, input: &Path) -> Result<Vec<PathBuf>, PandocError> {
        if !input.is_file() {
            return Err(PandocError::FileNotFound(input.to_path_buf()));
        }
        let dir = input.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

        let media_arg = format!("--extract-media={}", dir.display());
        let input_arg = input.display().to_string();
        let args = ["--verbose", media_arg.as_str(), input_arg.as_str()];
        let output = self.runner.run_checked(&self.exe, &args)?;

        let media_dir = dir.join("media");
        if !media_dir.is_dir() {
            // Nothing extracted; fall back to whatever the log mentioned.
            return Ok(parse_extracted_paths(&output.stdout, &output.stderr));
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut moved = Vec::new();
        let listing = fs::read_dir(&media_dir).map_err(|source| PandocError::Media {
            path: media_dir.clone(),
            source,
        })?;
        for dir_entry in listing {
            let dir_entry = dir_entry.map_err(|source| PandocError::Media {
                path: media_dir.clone(),
                source,
            })?;
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let target = dir.join(format!("{stem}_{name}"));
            if target.is_file() {
                fs::remove_file(&target).map_err(|source| PandocError::Media {
                    path: target.clone(),
                    source,
                })?;
            }
            fs::rename(dir_entry.path(), &target).map_err(|source| PandocError::Media {
                path: dir_entry.path(),
                source,
            })?;
            moved.push(target);
        }
        fs::remove_dir_all(&media_dir).map_err(|source| PandocError::Media {
            path: media_dir,
            source,
        })?;

        moved.sort();
        tracing::info!(count = moved.len(), "extracted media files");
        Ok(moved)
    }
}

/// Builds the full Pandoc argument list for one conversion.
fn build_convert_args(
    opts: &ConvertOptions,
    read: &str,
    write: &str,
    input: &Path,
    output: &Path,
    extra_args: &[String],
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    // standalone documents instead of fragments
    args.push("-s".to_string());
    args.push(if opts.verbose { "--verbose" } else { "--quiet" }.to_string());
    args.push(format!("--read={read}"));
    if write == "pdf" {
        args.push("--pdf-engine".to_string());
        args.push(opts.pdf_engine.clone());
    } else {
        args.push(format!("--write={write}"));
    }
    if opts.ppi != 96 {
        args.push(format!("--dpi={}", opts.ppi));
    }
    if opts.preserve_tabs {
        args.push("--preserve-tabs".to_string());
    }
    if opts.toc_depth >= 1 {
        args.push("--toc".to_string());
        args.push(format!("--toc-depth={}", opts.toc_depth));
    }
    if opts.atx_headers && (write.contains("markdown") || write.starts_with("asciidoc")) {
        args.push("--atx-headers".to_string());
    }
    if let Some(citations) = &opts.citations {
        args.push("--filter".to_string());
        args.push(CITEPROC_EXE.to_string());
        if let Some(bib) = &citations.bibliography {
            if bib.is_file() {
                args.push("--bibliography".to_string());
                args.push(bib.display().to_string());
            }
        }
        if let Some(csl) = &citations.csl {
            if csl.is_file() {
                args.push("--csl".to_string());
                args.push(csl.display().to_string());
            }
        }
    }
    args.extend(extra_args.iter().cloned());
    args.push(input.display().to_string());
    args.push("-o".to_string());
    args.push(output.display().to_string());

    args
}

/// Pulls the `Extracting <path>..` lines out of the conversion log.
fn parse_extracted_paths(stdout: &str, stderr: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .chain(stderr.lines())
        .filter_map(|line| line.split("Extracting ").nth(1))
        .map(|rest| PathBuf::from(rest.trim().trim_end_matches('.')))
        .collect()
}

fn nonempty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Wrapper around the pandoc-citeproc executable.
pub struct Citeproc<'r> {
    runner: &'r dyn CommandRunner,
    exe: String,
}

impl<'r> Citeproc<'r> {
    pub fn new(runner: &'r dyn CommandRunner) -> Self {
        Self::with_exe(runner, CITEPROC_EXE)
    }

    pub fn with_exe(runner: &'r dyn CommandRunner, exe: impl Into<String>) -> Self {
        Self {
            runner,
            exe: exe.into(),
        }
    }

    /// `pandoc-citeproc --version` output.
    pub fn version(&self) -> Result<String, RunnerError> {
        let output = self.runner.run_checked(&self.exe, &["--version"])?;
        Ok(output.stdout)
    }
}

impl BibConverter for Citeproc<'_> {
    fn bib_to_json(&self, path: &Path) -> Result<String, RunnerError> {
        let path_arg = path.display().to_string();
        let output = self
            .runner
            .run_checked(&self.exe, &["--bib2json", path_arg.as_str()])?;
        Ok(output.stdout)
    }

    fn bib_to_yaml(&self, path: &Path) -> Result<String, RunnerError> {
        let path_arg = path.display().to_string();
        let output = self
            .runner
            .run_checked(&self.exe, &["--bib2yaml", path_arg.as_str()])?;
        // Mendeley .bib exports wrap titles in nocase spans; strip them.
        Ok(output
            .stdout
            .replace("<span class=\"nocase\">", "")
            .replace("</span>", ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOutput;
    use std::cell::RefCell;

    /// Runner that records invocations and replays canned stdout.
    struct FakeRunner {
        stdout: String,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeRunner {
        fn new(stdout: &str) -> Self {
            Self {
                stdout: stdout.to_string(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn last_call(&self) -> Vec<String> {
            self.calls.borrow().last().cloned().unwrap_or_default()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<RunOutput, RunnerError> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|s| s.to_string()));
            self.calls.borrow_mut().push(call);
            Ok(RunOutput {
                stdout: self.stdout.clone(),
                stderr: String::new(),
                status: 0,
            })
        }
    }

    #[test]
    fn test_build_convert_args_defaults() {
        let args = build_convert_args(
            &ConvertOptions::default(),
            "markdown",
            "html5",
            Path::new("in.md"),
            Path::new("in.html"),
            &[],
        );
        assert_eq!(
            args,
            vec![
                "-s",
                "--quiet",
                "--read=markdown",
                "--write=html5",
                "in.md",
                "-o",
                "in.html"
            ]
        );
    }

    #[test]
    fn test_build_convert_args_pdf_uses_engine() {
        let opts = ConvertOptions {
            pdf_engine: "xelatex".to_string(),
            ..ConvertOptions::default()
        };
        let args = build_convert_args(&opts, "markdown", "pdf", Path::new("a.md"), Path::new("a.pdf"), &[]);
        assert!(args.contains(&"--pdf-engine".to_string()));
        assert!(args.contains(&"xelatex".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--write=")));
    }

    #[test]
    fn test_build_convert_args_toc_and_tabs() {
        let opts = ConvertOptions {
            toc_depth: 3,
            preserve_tabs: true,
            ppi: 150,
            ..ConvertOptions::default()
        };
        let args = build_convert_args(&opts, "docx", "markdown", Path::new("a.docx"), Path::new("a.md"), &[]);
        assert!(args.contains(&"--toc".to_string()));
        assert!(args.contains(&"--toc-depth=3".to_string()));
        assert!(args.contains(&"--preserve-tabs".to_string()));
        assert!(args.contains(&"--dpi=150".to_string()));
    }

    #[test]
    fn test_build_convert_args_atx_only_for_markdown_family() {
        let opts = ConvertOptions {
            atx_headers: true,
            ..ConvertOptions::default()
        };
        let md = build_convert_args(&opts, "docx", "markdown", Path::new("a.docx"), Path::new("a.md"), &[]);
        assert!(md.contains(&"--atx-headers".to_string()));

        let html = build_convert_args(&opts, "docx", "html5", Path::new("a.docx"), Path::new("a.html"), &[]);
        assert!(!html.contains(&"--atx-headers".to_string()));
    }

    #[test]
    fn test_build_convert_args_citations() {
        let dir = tempfile::tempdir().unwrap();
        let bib = dir.path().join("refs.bib");
        fs::write(&bib, "@book{x}").unwrap();

        let opts = ConvertOptions {
            citations: Some(CitationOptions {
                bibliography: Some(bib.clone()),
                csl: None,
            }),
            ..ConvertOptions::default()
        };
        let args = build_convert_args(&opts, "markdown", "docx", Path::new("a.md"), Path::new("a.docx"), &[]);

        let filter_pos = args.iter().position(|a| a == "--filter").unwrap();
        assert_eq!(args[filter_pos + 1], CITEPROC_EXE);
        assert!(args.contains(&"--bibliography".to_string()));
        assert!(args.contains(&bib.display().to_string()));
    }

    #[test]
    fn test_build_convert_args_extra_args_precede_input() {
        let extra = vec!["--number-sections".to_string()];
        let args = build_convert_args(
            &ConvertOptions::default(),
            "markdown",
            "html5",
            Path::new("a.md"),
            Path::new("a.html"),
            &extra,
        );
        let number = args.iter().position(|a| a == "--number-sections").unwrap();
        let input = args.iter().position(|a| a == "a.md").unwrap();
        assert!(number < input);
    }

    #[test]
    fn test_output_formats_prepends_pdf() {
        let runner = FakeRunner::new("docx\nhtml5\nmarkdown\n");
        let pandoc = Pandoc::new(&runner);
        let formats = pandoc.output_formats().unwrap();
        assert_eq!(formats[0], "pdf");
        assert!(formats.contains(&"html5".to_string()));
    }

    #[test]
    fn test_extensions_keeps_only_enabled() {
        let runner = FakeRunner::new("+citations\n-raw_tex\n+smart\n");
        let pandoc = Pandoc::new(&runner);
        assert_eq!(pandoc.extensions().unwrap(), vec!["citations", "smart"]);
    }

    #[test]
    fn test_parse_extracted_paths() {
        let log = "[INFO] Extracting media/image1.png..\nnoise\n[INFO] Extracting media/fig2.jpg..\n";
        let paths = parse_extracted_paths(log, "");
        assert_eq!(
            paths,
            vec![PathBuf::from("media/image1.png"), PathBuf::from("media/fig2.jpg")]
        );
    }

    #[test]
    fn test_extract_media_renames_and_moves_files() {
        // Given: a document and a media/ scratch directory as pandoc leaves it
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("paper.docx");
        fs::write(&doc, "doc").unwrap();
        let media = dir.path().join("media");
        fs::create_dir(&media).unwrap();
        fs::write(media.join("image1.png"), "png").unwrap();

        // When: we extract (the fake runner does nothing; the scratch
        // directory stands in for pandoc's output)
        let runner = FakeRunner::new("");
        let pandoc = Pandoc::new(&runner);
        let moved = pandoc.extract_media(&doc).unwrap();

        // Then: the file is renamed next to the document and the scratch
        // directory is gone
        assert_eq!(moved, vec![dir.path().join("paper_image1.png")]);
        assert!(moved[0].is_file());
        assert!(!media.exists());
    }

    #[test]
    fn test_extract_media_missing_input() {
        let runner = FakeRunner::new("");
        let pandoc = Pandoc::new(&runner);
        let result = pandoc.extract_media(Path::new("/nonexistent/doc.docx"));
        assert!(matches!(result.unwrap_err(), PandocError::FileNotFound(_)));
    }

    #[test]
    fn test_citeproc_bib_to_yaml_strips_nocase_spans() {
        let runner = FakeRunner::new(
            "---\nreferences:\n- title: <span class=\"nocase\">DNA</span> repair\n...\n",
        );
        let citeproc = Citeproc::new(&runner);
        let yaml = citeproc.bib_to_yaml(Path::new("refs.bib")).unwrap();
        assert!(yaml.contains("- title: DNA repair"));
        assert!(!yaml.contains("span"));
    }

    #[test]
    fn test_citeproc_bib_to_json_passes_flag() {
        let runner = FakeRunner::new("[]");
        let citeproc = Citeproc::new(&runner);
        citeproc.bib_to_json(Path::new("refs.bib")).unwrap();
        assert_eq!(
            runner.last_call(),
            vec!["pandoc-citeproc", "--bib2json", "refs.bib"]
        );
    }
}
