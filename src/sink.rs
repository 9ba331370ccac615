//! [`ExpectationSink`]: the output channel handed to the program under test.

use crate::expectation::Expectation;
use crate::report::{ERR_PREFIX, Mismatch, is_harness_line};
use crate::session::Session;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use tracing::debug;

/// Receives every output line, for instance to echo it on the real console.
pub type OutputHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Stands in for the program's standard output.
///
/// Bytes are gathered into lines; each completed line is checked against the
/// next expected value, forwarded to the output handler, and appended to the
/// log. A mismatch is recorded in the shared [`Session`] and the run goes on.
pub struct ExpectationSink {
    expected: Vec<Expectation>,
    session: Arc<Session>,
    pending: Vec<u8>,
    output_handler: OutputHandler,
    log: Option<BufWriter<File>>,
}

impl ExpectationSink {
    pub fn new(expected: Vec<Expectation>, output_handler: OutputHandler) -> Self {
        Self {
            session: Arc::new(Session::new(expected.len())),
            expected,
            pending: Vec::new(),
            output_handler,
            log: None,
        }
    }

    /// A sink whose output goes nowhere but the log and the session.
    pub fn silent(expected: Vec<Expectation>) -> Self {
        Self::new(expected, Arc::new(|_: &[u8]| {}))
    }

    /// Append every line, verbatim, to `log`.
    pub fn with_log(mut self, log: File) -> Self {
        self.log = Some(BufWriter::new(log));
        self
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }

    /// Process a trailing line that was never terminated, then flush the log.
    ///
    /// Call once the program is done writing; unterminated output is otherwise lost.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.process_line(&line)?;
        }
        self.flush()
    }

    fn process_line(&mut self, raw: &[u8]) -> io::Result<()> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw).into_owned();

        let mut echoed = line.clone().into_bytes();
        echoed.push(b'\n');
        (self.output_handler)(&echoed);

        let mismatch = if is_harness_line(&line) {
            None
        } else {
            let expected = &self.expected;
            self.session.observe_output(|index| judge(expected, index, &line))
        };
        debug!(line = %line, matched = mismatch.is_none(), "output line");

        if let Some(log) = &mut self.log {
            writeln!(log, "{line}")?;
            if let Some(mismatch) = &mismatch {
                writeln!(log, "{ERR_PREFIX}{mismatch}")?;
            }
        }
        Ok(())
    }
}

fn judge(expected: &[Expectation], index: usize, line: &str) -> Option<Mismatch> {
    match expected.get(index) {
        None => Some(Mismatch::Unexpected {
            index,
            actual: line.to_string(),
        }),
        Some(expectation) if expectation.matches(line) => None,
        Some(expectation) => Some(Mismatch::Output {
            index,
            expected: expectation.to_string(),
            actual: line.to_string(),
        }),
    }
}

impl Write for ExpectationSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.process_line(&line[..pos])?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.log {
            Some(log) => log.flush(),
            None => Ok(()),
        }
    }
}
