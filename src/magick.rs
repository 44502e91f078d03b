//! ImageMagick invocation.
//!
//! Builds `magick convert` argument lists and scrapes the `-list format`
//! output to learn which image formats the installation can both read and
//! write.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::runner::{CommandRunner, RunnerError};

/// Default ImageMagick executable name.
pub const MAGICK_EXE: &str = "magick";

/// Errors from the image-conversion wrapper.
#[derive(Error, Debug)]
pub enum MagickError {
    #[error("input image not found: '{0}'")]
    FileNotFound(PathBuf),

    #[error("unsupported image format: '{0}'")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Tool(#[from] RunnerError),
}

/// Options for one image conversion.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub verbose: bool,
    /// Pixel density; 72 is ImageMagick's default and is not passed
    /// explicitly.
    pub density: u32,
    /// Resize factor in percent; 100 leaves the size untouched.
    pub resize_percent: u32,
    pub grayscale: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            density: 96,
            resize_percent: 100,
            grayscale: false,
        }
    }
}

/// Wrapper around the ImageMagick executable.
pub struct Magick<'r> {
    runner: &'r dyn CommandRunner,
    exe: String,
}

impl<'r> Magick<'r> {
    pub fn new(runner: &'r dyn CommandRunner) -> Self {
        Self::with_exe(runner, MAGICK_EXE)
    }

    pub fn with_exe(runner: &'r dyn CommandRunner, exe: impl Into<String>) -> Self {
        Self {
            runner,
            exe: exe.into(),
        }
    }

    /// `magick convert --version` output.
    pub fn version(&self) -> Result<String, MagickError> {
        let output = self.runner.run_checked(&self.exe, &["convert", "--version"])?;
        Ok(output.stdout)
    }

    /// Extensions of the formats the installation can read and write.
    pub fn formats(&self) -> Result<Vec<String>, MagickError> {
        let output = self.runner.run_checked(&self.exe, &["-list", "format"])?;
        Ok(parse_rw_formats(&output.stdout))
    }

    /// Converts `input` to `output`, inferring both formats from the file
    /// extensions. Returns the output path.
    pub fn convert_image(
        &self,
        opts: &ImageOptions,
        input: &Path,
        output: &Path,
        extra_args: &[String],
    ) -> Result<PathBuf, MagickError> {
        if !input.is_file() {
            return Err(MagickError::FileNotFound(input.to_path_buf()));
        }

        let supported = self.formats()?;
        for path in [input, output] {
            let ext = extension_of(path)
                .ok_or_else(|| MagickError::UnsupportedFormat(path.display().to_string()))?;
            if !supported.contains(&ext) {
                return Err(MagickError::UnsupportedFormat(ext));
            }
        }

        let args = build_image_args(opts, input, output, extra_args);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            "converting image"
        );
        self.runner.run_checked(&self.exe, &arg_refs)?;
        Ok(output.to_path_buf())
    }
}

fn build_image_args(
    opts: &ImageOptions,
    input: &Path,
    output: &Path,
    extra_args: &[String],
) -> Vec<String> {
    let mut args: Vec<String> = vec!["convert".to_string(), input.display().to_string()];
    args.push(if opts.verbose { "-verbose" } else { "-quiet" }.to_string());
    if opts.density != 72 {
        args.push("-density".to_string());
        args.push(opts.density.to_string());
    }
    if opts.resize_percent != 100 {
        args.push("-resize".to_string());
        args.push(format!("{}%", opts.resize_percent));
    }
    if opts.grayscale {
        args.push("-colorspace".to_string());
        args.push("Gray".to_string());
    }
    args.extend(extra_args.iter().cloned());
    args.push(output.display().to_string());
    args
}

/// Parses the `-list format` table, keeping the formats with `rw` mode
/// (readable and writable) and returning their lowercased extensions.
fn parse_rw_formats(listing: &str) -> Vec<String> {
    let rw = Regex::new(r" rw[+-] ").expect("static pattern");
    listing
        .lines()
        .filter(|line| rw.is_match(line))
        .filter_map(|line| line.trim().split_whitespace().next())
        .map(|token| format!(".{}", token.trim_end_matches('*').to_lowercase()))
        .collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}
