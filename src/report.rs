//! Verdicts produced by replaying a transcript.

use thiserror::Error;

/// Prefix of harness error diagnostics. Program output starting with it is
/// never matched against an expectation.
pub const ERR_PREFIX: &str = "$Error: ";
/// Prefix of harness narration. Program output starting with it is never
/// matched against an expectation.
pub const TEST_PREFIX: &str = "Test: ";

/// Whether `line` is harness narration rather than program output.
pub fn is_harness_line(line: &str) -> bool {
    line.starts_with(ERR_PREFIX) || line.starts_with(TEST_PREFIX)
}

/// One divergence between a transcript and what the program did.
///
/// Mismatches accumulate; none of them stops a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Mismatch {
    #[error("output #{index}: expected `{expected}`, actual `{actual}`")]
    Output {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("output #{index}: unexpected output `{actual}`")]
    Unexpected { index: usize, actual: String },

    #[error("expected output count: {expected}, actual: {actual}")]
    Count { expected: usize, actual: usize },

    #[error("expected input: {consumed} of {total} scripted lines consumed")]
    PendingInput { consumed: usize, total: usize },

    #[error("input #{input} still waiting for output #{awaiting} after {waited_ms}ms")]
    HandshakeTimeout {
        input: usize,
        awaiting: usize,
        waited_ms: u128,
    },
}

/// Outcome of replaying one transcript.
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub mismatches: Vec<Mismatch>,
    /// Output lines checked against the expected queue.
    pub lines_processed: usize,
    pub expected_total: usize,
    pub inputs_consumed: usize,
    pub inputs_total: usize,
    /// The program failed, panicked, or ran out of time.
    pub invocation_error: Option<String>,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.invocation_error.is_none()
    }

    /// Every problem as a prefixed diagnostic line, in the order observed.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .mismatches
            .iter()
            .map(|m| format!("{ERR_PREFIX}{m}"))
            .collect();
        if let Some(err) = &self.invocation_error {
            lines.push(format!("{ERR_PREFIX}Something went wrong while testing: {err}"));
        }
        lines
    }
}
