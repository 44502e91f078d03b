//! Shared test helpers for integration tests.

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use manuscript_tools::runner::{CommandRunner, RunOutput, RunnerError};

/// Runner that replays canned stdout per program name and records every
/// invocation, so tests can run the wrappers without the tools installed.
#[derive(Default)]
pub struct FakeRunner {
    responses: Vec<(String, String)>,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the stdout to replay when `program` is invoked.
    pub fn respond(mut self, program: &str, stdout: &str) -> Self {
        self.responses.push((program.to_string(), stdout.to_string()));
        self
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<RunOutput, RunnerError> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|s| s.to_string()));
        self.calls.borrow_mut().push(call);

        let stdout = self
            .responses
            .iter()
            .find(|(p, _)| p == program)
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(RunOutput {
            stdout,
            stderr: String::new(),
            status: 0,
        })
    }
}

/// Builds a CSL-JSON array of records from a list of ids.
///
/// Each record gets an auto-generated author, a title, a 2020 issued date
/// and a keyword field.
pub fn build_records(ids: &[&str]) -> String {
    let records: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r#"{{"id": "{id}", "type": "article-journal", "author": [{{"family": "Author", "given": "A."}}], "title": "Title {id}", "issued": {{"date-parts": [[2020]]}}, "keyword": "test,fixture"}}"#
            )
        })
        .collect();
    format!("[{}]", records.join(", "))
}

/// Creates a temporary file with the given content and extension
/// (extension includes the leading dot).
pub fn create_temp_file(content: &str, extension: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Asserts that `path` carries a recognized bibliographic extension, as a
/// sanity guard for fixtures.
pub fn assert_bib_fixture(path: &Path) {
    assert!(
        manuscript_tools::formats::is_bib_format(path),
        "fixture '{}' must use a recognized bibliographic extension",
        path.display()
    );
}
