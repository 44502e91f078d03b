//! CLI integration tests.
//!
//! Tests the command-line interface by running the binary as a subprocess.
//! Only paths that fail before reaching the external tools are exercised
//! here, so the suite passes without Pandoc or ImageMagick installed.

mod common;

use std::process::Command;

use common::create_temp_file;

/// Path to the compiled binary.
fn binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_manuscript-tools")
}

// ============================================
// Argument parsing
// ============================================

#[test]
fn test_cli_help() {
    // Given: the CLI binary
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("failed to execute command");

    // Then: help lists the subcommands
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in [
        "fetch-csl",
        "extract-media",
        "convert-document",
        "convert-image",
        "xref",
        "embed-bib",
        "info",
    ] {
        assert!(
            stdout.contains(subcommand),
            "help should mention '{}': {}",
            subcommand,
            stdout
        );
    }
    assert!(output.status.success(), "help should exit with success");
}

#[test]
fn test_cli_xref_subcommand_help() {
    let output = Command::new(binary_path())
        .args(["xref", "--help"])
        .output()
        .expect("failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--md"), "xref help should mention --md: {}", stdout);
    assert!(stdout.contains("--bib"), "xref help should mention --bib: {}", stdout);
    assert!(output.status.success());
}

#[test]
fn test_cli_xref_missing_args() {
    // Given: xref without its required arguments
    let output = Command::new(binary_path())
        .args(["xref"])
        .output()
        .expect("failed to execute command");

    // Then: clap reports the missing arguments on stderr
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--md") || stderr.contains("required"), "{}", stderr);
}

#[test]
fn test_cli_unknown_subcommand() {
    let output = Command::new(binary_path())
        .args(["transmogrify"])
        .output()
        .expect("failed to execute command");

    assert!(!output.status.success());
}

// ============================================
// Fail-fast error paths (no external tools needed)
// ============================================

#[test]
fn test_cli_xref_missing_markdown_file_exits_10() {
    let bib = create_temp_file("@article{X}", ".bib");
    let output = Command::new(binary_path())
        .args(["xref", "--md", "/nonexistent/paper.md"])
        .args(["--bib", &bib.path().display().to_string()])
        .output()
        .expect("failed to execute command");

    assert_eq!(output.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "{}", stderr);
}

#[test]
fn test_cli_xref_unsupported_bibliography_exits_11() {
    // Given: a markdown file and a bibliography with an unrecognized extension
    let md = create_temp_file("see @Doe2020", ".md");
    let bib = create_temp_file("not a bibliography", ".docx");

    let output = Command::new(binary_path())
        .args(["xref", "--md", &md.path().display().to_string()])
        .args(["--bib", &bib.path().display().to_string()])
        .output()
        .expect("failed to execute command");

    // Then: the format gate rejects it before any tool is invoked
    assert_eq!(output.status.code(), Some(11));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unsupported bibliography format"),
        "{}",
        stderr
    );
}

#[test]
fn test_cli_embed_bib_missing_bibliography_exits_11() {
    let output = Command::new(binary_path())
        .args(["embed-bib", "--bib", "/nonexistent/refs.bib"])
        .output()
        .expect("failed to execute command");

    assert_eq!(output.status.code(), Some(11));
}

#[test]
fn test_cli_convert_document_missing_input_exits_with_error() {
    let output = Command::new(binary_path())
        .args(["convert-document", "--input", "/nonexistent/paper.md"])
        .args(["--read", "markdown", "--write", "html5"])
        .output()
        .expect("failed to execute command");

    assert!(!output.status.success());
}

#[test]
fn test_cli_error_messages_include_a_hint() {
    let md = create_temp_file("text", ".md");
    let bib = create_temp_file("x", ".docx");

    let output = Command::new(binary_path())
        .args(["xref", "--md", &md.path().display().to_string()])
        .args(["--bib", &bib.path().display().to_string()])
        .output()
        .expect("failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hint:"), "{}", stderr);
}
