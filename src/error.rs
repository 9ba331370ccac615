//! Error types for parsing transcripts, binding a session, and running suites.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// An expectation token that matched the grammar but does not hold a usable value.
#[derive(Debug, Error, PartialEq)]
#[error("invalid expected value: {0}")]
pub struct InvalidExpectation(pub String);

/// A transcript file that cannot be replayed. The whole file is rejected.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read transcript: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: malformed line: {text}")]
    Malformed { line: usize, text: String },

    #[error("line {line}: {source}")]
    InvalidValue {
        line: usize,
        #[source]
        source: InvalidExpectation,
    },

    #[error("line {line}: startup arguments must be the first line")]
    MisplacedArgs { line: usize },

    #[error("line {line}: startup arguments given more than once")]
    DuplicateArgs { line: usize },

    #[error("line {line}: quoted text is never closed")]
    UnterminatedQuote { line: usize },

    #[error("empty test file")]
    Empty,
}

/// Failure to connect an input source to an output sink.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("input source is already connected")]
    SourceAlreadyBound,

    #[error("output sink is already connected to a source")]
    SinkAlreadyBound,

    #[error("no scripted input to replay")]
    NothingToReplay,
}

/// Setup failure that prevents one transcript from running at all.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("failed to create log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure that prevents a whole suite from running.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("given path doesn't exist or is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("directory {0} doesn't contain test files")]
    NoTranscripts(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
