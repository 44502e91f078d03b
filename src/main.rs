//! CLI for manuscript-tools - convert manuscripts and cross-reference
//! citations via Pandoc and ImageMagick.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manuscript_tools::csl::{fetch_csl, CslRepository, StyleError};
use manuscript_tools::library::{Library, LibraryError};
use manuscript_tools::magick::{ImageOptions, Magick, MagickError, MAGICK_EXE};
use manuscript_tools::markdown::citation_key_set;
use manuscript_tools::metadata::{self, MetadataError};
use manuscript_tools::pandoc::{
    Citeproc, CitationOptions, ConvertOptions, Pandoc, PandocError, CITEPROC_EXE, PANDOC_EXE,
};
use manuscript_tools::runner::SystemRunner;
use manuscript_tools::{formats, xref, BibConverter};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Convert manuscripts and cross-reference citations via Pandoc and
/// ImageMagick
#[derive(Parser)]
#[command(name = "manuscript-tools")]
#[command(version)]
#[command(after_help = "\
Examples:
  manuscript-tools convert-document --input paper.md --read markdown --write docx
  manuscript-tools --citations --bibliography refs.bib --csl apa convert-document --input paper.md --read markdown --write pdf
  manuscript-tools xref --md paper.md --bib refs.bib
  manuscript-tools fetch-csl --style chicago
  manuscript-tools --link-citations embed-bib --bib refs.bib --doc paper.md")]
struct Cli {
    /// Directory against which bare file names are resolved
    #[arg(long, global = true, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Verbose tool output and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pandoc executable
    #[arg(long, global = true, default_value = PANDOC_EXE, value_name = "EXE")]
    pandoc_path: String,

    /// pandoc-citeproc executable
    #[arg(long, global = true, default_value = CITEPROC_EXE, value_name = "EXE")]
    citeproc_path: String,

    /// ImageMagick executable
    #[arg(long, global = true, default_value = MAGICK_EXE, value_name = "EXE")]
    magick_path: String,

    /// Output resolution in pixels per inch
    #[arg(long, global = true, default_value_t = 96)]
    ppi: u32,

    /// PDF engine used for typesetting
    #[arg(long, global = true, default_value = "pdflatex")]
    pdf_engine: String,

    /// Render citations during document conversion
    #[arg(long, global = true)]
    citations: bool,

    /// Bibliography file used for citation rendering
    #[arg(long = "bibliography", global = true, value_name = "FILE")]
    bibliography: Option<PathBuf>,

    /// Citation style sheet used for citation rendering
    #[arg(long, global = true, value_name = "FILE")]
    csl: Option<PathBuf>,

    /// Hyperlink in-text citations to their bibliography entries
    #[arg(long, global = true)]
    link_citations: bool,

    /// Table of contents depth; 0 disables the TOC
    #[arg(long, global = true, default_value_t = 0)]
    toc_depth: u8,

    /// ATX headers for markdown and asciidoc outputs
    #[arg(long, global = true)]
    atx_headers: bool,

    /// Preserve tabs in literal code blocks
    #[arg(long, global = true)]
    preserve_tabs: bool,

    /// Resize images by this percentage during conversion
    #[arg(long, global = true, default_value_t = 100)]
    resize: u32,

    /// Convert images to grayscale
    #[arg(long, global = true)]
    grayscale: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a citation style sheet into the style cache
    FetchCsl {
        /// Style name or common alias (mla, chicago, acm, acs, aaa, apsa)
        #[arg(long)]
        style: String,

        /// Overwrite an already-cached style with fresh content
        #[arg(long)]
        update: bool,

        /// Style cache directory (default: <work-dir>/csls)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Extract media files from a document into its directory
    ExtractMedia {
        /// Input document
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Convert between document formats
    ConvertDocument {
        /// Input document
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Input format (see 'info' for the supported list)
        #[arg(long)]
        read: String,

        /// Output format (see 'info' for the supported list)
        #[arg(long)]
        write: String,

        /// Extra Pandoc arguments, ';'-delimited
        #[arg(long = "args", value_delimiter = ';')]
        extra_args: Vec<String>,
    },

    /// Convert between image formats
    ConvertImage {
        /// Input image
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Output image
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Extra ImageMagick arguments, ';'-delimited
        #[arg(long = "args", value_delimiter = ';')]
        extra_args: Vec<String>,
    },

    /// Cross-reference citations in a markdown file against a bibliography
    Xref {
        /// Markdown file using @key citations
        #[arg(long, value_name = "FILE")]
        md: PathBuf,

        /// Bibliography file of a supported format
        #[arg(long, value_name = "FILE")]
        bib: PathBuf,
    },

    /// Embed a bibliography as YAML metadata in a document's front matter
    EmbedBib {
        /// Bibliography file of a supported format
        #[arg(long, value_name = "FILE")]
        bib: PathBuf,

        /// Document to splice into; without it a standalone .yml is written
        #[arg(long, value_name = "FILE")]
        doc: Option<PathBuf>,
    },

    /// Show executable versions and supported formats
    Info,
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — input file not found / unreadable
    Input(String),
    /// Exit 11 — bibliography file not found / unsupported / unparseable
    Bibliography(String),
    /// Exit 12 — style not found / fetch failed
    Style(String),
    /// Exit 13 — document metadata problem
    Metadata(String),
    /// Exit 14 — external tool failure
    Tool(String),
    /// Exit 15 — cannot write an output file
    Output(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Input(_) => 10,
            AppError::Bibliography(_) => 11,
            AppError::Style(_) => 12,
            AppError::Metadata(_) => 13,
            AppError::Tool(_) => 14,
            AppError::Output(_) => 15,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Input(msg) => {
                write!(f, "{}\n  hint: verify the file path is correct", msg)
            }
            AppError::Bibliography(msg) => {
                write!(
                    f,
                    "{}\n  hint: recognized bibliographic extensions: {}",
                    msg,
                    formats::bib_extensions().join(" ")
                )
            }
            AppError::Style(msg) => {
                write!(
                    f,
                    "{}\n  hint: see https://citationstyles.org/ for available styles",
                    msg
                )
            }
            AppError::Metadata(msg) => write!(f, "{}", msg),
            AppError::Tool(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that Pandoc, pandoc-citeproc and ImageMagick are installed",
                    msg
                )
            }
            AppError::Output(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
        }
    }
}

impl From<LibraryError> for AppError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::Converter(inner) => AppError::Tool(inner.to_string()),
            other => AppError::Bibliography(other.to_string()),
        }
    }
}

impl From<StyleError> for AppError {
    fn from(e: StyleError) -> Self {
        match e {
            StyleError::Io { .. } => AppError::Output(e.to_string()),
            other => AppError::Style(other.to_string()),
        }
    }
}

impl From<MetadataError> for AppError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::FileNotFound(_) => AppError::Input(e.to_string()),
            MetadataError::Io { .. } => AppError::Output(e.to_string()),
            other => AppError::Metadata(other.to_string()),
        }
    }
}

impl From<PandocError> for AppError {
    fn from(e: PandocError) -> Self {
        match e {
            PandocError::FileNotFound(_) => AppError::Input(e.to_string()),
            PandocError::UnsupportedFormat(_) => AppError::Input(e.to_string()),
            other => AppError::Tool(other.to_string()),
        }
    }
}

impl From<MagickError> for AppError {
    fn from(e: MagickError) -> Self {
        match e {
            MagickError::FileNotFound(_) => AppError::Input(e.to_string()),
            MagickError::UnsupportedFormat(_) => AppError::Input(e.to_string()),
            MagickError::Tool(inner) => AppError::Tool(inner.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves a bare file name against the working directory; paths that
/// already carry a directory component pass through untouched.
fn resolve(path: &Path, work_dir: Option<&Path>) -> PathBuf {
    match work_dir {
        Some(dir) if path.parent() == Some(Path::new("")) => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let runner = SystemRunner;
    let work_dir = cli.work_dir.as_deref();

    match &cli.command {
        Commands::FetchCsl { style, update, dir } => {
            let cache_dir = dir.clone().unwrap_or_else(|| {
                work_dir
                    .map(|d| d.join("csls"))
                    .unwrap_or_else(|| PathBuf::from("csls"))
            });
            let repository = CslRepository::new();
            let path = fetch_csl(style, &cache_dir, *update, &repository)?;
            println!("{}", path.display());
        }

        Commands::ExtractMedia { input } => {
            let input = resolve(input, work_dir);
            let pandoc = Pandoc::with_exe(&runner, cli.pandoc_path.as_str());
            let extracted = pandoc.extract_media(&input)?;
            for path in &extracted {
                println!("{}", path.display());
            }
            if extracted.is_empty() {
                println!("no media found in '{}'", input.display());
            }
        }

        Commands::ConvertDocument {
            input,
            read,
            write,
            extra_args,
        } => {
            let input = resolve(input, work_dir);
            let pandoc = Pandoc::with_exe(&runner, cli.pandoc_path.as_str());
            let opts = convert_options(&cli, work_dir);
            let output = pandoc.convert_document(&opts, read, write, &input, extra_args)?;
            println!("{}", output.display());
        }

        Commands::ConvertImage {
            input,
            output,
            extra_args,
        } => {
            let input = resolve(input, work_dir);
            let output = resolve(output, work_dir);
            let magick = Magick::with_exe(&runner, cli.magick_path.as_str());
            let opts = ImageOptions {
                verbose: cli.verbose,
                density: cli.ppi,
                resize_percent: cli.resize,
                grayscale: cli.grayscale,
            };
            let written = magick.convert_image(&opts, &input, &output, extra_args)?;
            println!("{}", written.display());
        }

        Commands::Xref { md, bib } => {
            let md = resolve(md, work_dir);
            let bib = resolve(bib, work_dir);

            let markdown = fs::read_to_string(&md)
                .map_err(|e| AppError::Input(format!("'{}': {}", md.display(), e)))?;
            let keys = citation_key_set(&markdown);

            let citeproc = Citeproc::with_exe(&runner, cli.citeproc_path.as_str());
            let library = Library::load(&bib, &citeproc)?;

            let missing = xref::missing_entries(&keys, &library);
            println!("{}", xref::report(&missing));
        }

        Commands::EmbedBib { bib, doc } => {
            let bib = resolve(bib, work_dir);
            if !formats::is_bib_format(&bib) {
                return Err(AppError::Bibliography(format!(
                    "unsupported bibliography format: '{}'",
                    bib.display()
                )));
            }
            if !bib.is_file() {
                return Err(AppError::Bibliography(format!(
                    "bibliography file not found: '{}'",
                    bib.display()
                )));
            }

            let citeproc = Citeproc::with_exe(&runner, cli.citeproc_path.as_str());
            let block = citeproc
                .bib_to_yaml(&bib)
                .map_err(|e| AppError::Tool(e.to_string()))?;
            let payload = metadata::yaml_block_body(&block);

            match doc {
                Some(doc) => {
                    let doc = resolve(doc, work_dir);
                    metadata::embed_into_file(&payload, cli.link_citations, &doc)?;
                    println!("{}", doc.display());
                }
                None => {
                    let target = bib.with_extension("yml");
                    metadata::write_standalone(&payload, cli.link_citations, &target)?;
                    println!("{}", target.display());
                }
            }
        }

        Commands::Info => {
            info_command(&cli, &runner)?;
        }
    }

    Ok(())
}

/// Assembles document conversion options from the global CLI flags.
fn convert_options(cli: &Cli, work_dir: Option<&Path>) -> ConvertOptions {
    let citations = cli.citations.then(|| CitationOptions {
        bibliography: cli.bibliography.as_deref().map(|p| resolve(p, work_dir)),
        csl: cli.csl.as_deref().map(|p| resolve(p, work_dir)),
    });
    ConvertOptions {
        verbose: cli.verbose,
        ppi: cli.ppi,
        pdf_engine: cli.pdf_engine.clone(),
        toc_depth: cli.toc_depth,
        atx_headers: cli.atx_headers,
        preserve_tabs: cli.preserve_tabs,
        citations,
    }
}

/// Prints executable versions and the supported format lists.
fn info_command(cli: &Cli, runner: &SystemRunner) -> Result<(), AppError> {
    let pandoc = Pandoc::with_exe(runner, cli.pandoc_path.as_str());
    let citeproc = Citeproc::with_exe(runner, cli.citeproc_path.as_str());
    let magick = Magick::with_exe(runner, cli.magick_path.as_str());

    println!("{}", pandoc.version()?.trim_end());
    println!();
    match citeproc.version() {
        Ok(version) => println!("{}", version.trim_end()),
        Err(e) => println!("pandoc-citeproc: unavailable ({})", e),
    }
    println!();
    match magick.version() {
        Ok(version) => println!("{}", version.trim_end()),
        Err(e) => println!("magick: unavailable ({})", e),
    }

    println!("\nDocument formats - input:");
    println!("{}", pandoc.input_formats()?.join(" "));
    println!("\nDocument formats - output:");
    println!("{}", pandoc.output_formats()?.join(" "));
    println!("\nBibliographic formats:");
    println!("{}", formats::bib_extensions().join(" "));
    match magick.formats() {
        Ok(image_formats) => {
            println!("\nImage formats:");
            println!("{}", image_formats.join(" "));
        }
        Err(_) => println!("\nImage formats: unavailable"),
    }

    Ok(())
}
