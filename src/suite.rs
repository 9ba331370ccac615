//! Running every transcript in a directory.

use crate::error::SuiteError;
use crate::parser::parse_file;
use crate::program::Program;
use crate::report::{ERR_PREFIX, FileReport, TEST_PREFIX};
use crate::runner::Runner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to one transcript file.
#[derive(Debug)]
pub enum FileOutcome {
    Passed(FileReport),
    Failed(FileReport),
    /// The transcript could not be parsed; nothing ran.
    Skipped(String),
    /// The session could not be set up; nothing ran.
    Aborted(String),
}

#[derive(Debug, Default)]
pub struct SuiteSummary {
    pub files: Vec<(PathBuf, FileOutcome)>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Passed(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_) | FileOutcome::Aborted(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    /// 0 when every transcript passed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.passed() == self.files.len() { 0 } else { 1 }
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Every transcript in one directory, run one after another.
pub struct Suite {
    dir: PathBuf,
    runner: Runner,
}

impl Suite {
    pub fn new(dir: impl Into<PathBuf>, runner: Runner) -> Self {
        Self {
            dir: dir.into(),
            runner,
        }
    }

    /// Transcript files in the directory, sorted by name.
    pub fn discover(&self) -> Result<Vec<PathBuf>, SuiteError> {
        if !self.dir.is_dir() {
            return Err(SuiteError::NotADirectory(self.dir.clone()));
        }
        let read_dir_err = |source| SuiteError::ReadDir {
            path: self.dir.clone(),
            source,
        };
        let extension = self.runner.config().extension.as_str();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(read_dir_err)? {
            let path = entry.map_err(read_dir_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(SuiteError::NoTranscripts(self.dir.clone()));
        }
        files.sort();
        Ok(files)
    }

    /// Run every transcript against `program`, narrating on stdout and stderr.
    ///
    /// A bad transcript or a failing program only affects its own file.
    pub async fn run(&self, program: Arc<dyn Program>) -> Result<SuiteSummary, SuiteError> {
        let files = self.discover()?;
        let log_dir = self.dir.join(&self.runner.config().log_dir);
        std::fs::create_dir_all(&log_dir).map_err(|source| SuiteError::LogDir {
            path: log_dir.clone(),
            source,
        })?;
        info!(dir = %self.dir.display(), files = files.len(), "running suite");

        let mut summary = SuiteSummary::default();
        for path in files {
            let outcome = self.run_file(program.clone(), &path, &log_dir).await;
            summary.files.push((path, outcome));
        }
        println!(
            "{TEST_PREFIX}{} passed, {} failed, {} skipped",
            summary.passed(),
            summary.failed(),
            summary.skipped()
        );
        Ok(summary)
    }

    async fn run_file(&self, program: Arc<dyn Program>, path: &Path, log_dir: &Path) -> FileOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{TEST_PREFIX}## file: {name}");

        let transcript = match parse_file(path) {
            Ok(transcript) => transcript,
            Err(err) => {
                warn!(file = %name, error = %err, "bad transcript");
                eprintln!("{ERR_PREFIX}Bad formatted file: {name}: {err}");
                return FileOutcome::Skipped(err.to_string());
            }
        };

        let log = self.runner.config().log_path(log_dir, path);
        match self.runner.run(program, &transcript, Some(&log)).await {
            Ok(report) => {
                for line in report.diagnostics() {
                    eprintln!("{line}");
                }
                if report.passed() {
                    println!("{TEST_PREFIX}{name} passed");
                    FileOutcome::Passed(report)
                } else {
                    println!("{TEST_PREFIX}{name} failed");
                    FileOutcome::Failed(report)
                }
            }
            Err(err) => {
                warn!(file = %name, error = %err, "transcript could not run");
                eprintln!("{ERR_PREFIX}{name}: {err}");
                FileOutcome::Aborted(err.to_string())
            }
        }
    }
}
