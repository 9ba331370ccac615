//! [`ExpectationSource`]: the input channel handed to the program under test.

use crate::error::BindingError;
use crate::session::{Release, Session};
use crate::sink::ExpectationSink;
use crate::transcript::ScriptedInput;
use std::io::{self, BufRead, Read};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Stands in for the program's standard input.
///
/// Each scripted line is released only once the connected sink has observed
/// the outputs the transcript places before it. An exhausted queue reads as
/// end of input.
pub struct ExpectationSource {
    inputs: Vec<ScriptedInput>,
    cursor: usize,
    timeout: Duration,
    session: Option<Arc<Session>>,
    buffer: Vec<u8>,
    pos: usize,
}

impl ExpectationSource {
    /// Create a source with the default 5-second handshake timeout.
    pub fn new(inputs: Vec<ScriptedInput>) -> Self {
        Self::with_timeout(inputs, Duration::from_secs(5))
    }

    /// Create a source that waits at most `timeout` for each input's gate.
    pub fn with_timeout(inputs: Vec<ScriptedInput>, timeout: Duration) -> Self {
        Self {
            inputs,
            cursor: 0,
            timeout,
            session: None,
            buffer: Vec::new(),
            pos: 0,
        }
    }

    /// Bind this source to `sink`. Must happen exactly once, before the first read.
    pub fn connect(&mut self, sink: &ExpectationSink) -> Result<(), BindingError> {
        if self.session.is_some() {
            return Err(BindingError::SourceAlreadyBound);
        }
        if self.inputs.is_empty() {
            return Err(BindingError::NothingToReplay);
        }
        let session = sink.session();
        session.bind(self.inputs.len())?;
        self.session = Some(session);
        Ok(())
    }

    /// Whether scripted input is still waiting to be read.
    pub fn is_expecting(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.snapshot().expecting)
    }

    /// Wait for the next input's gate and return its text, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let session = self.session.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "input source is not connected")
        })?;
        let Some(input) = self.inputs.get(self.cursor) else {
            return Ok(None);
        };

        match session.wait_for_gate(self.cursor, input.gate, self.timeout) {
            Release::Ready => {
                debug!(input = self.cursor, text = %input.text, "releasing input");
                self.cursor += 1;
                Ok(Some(input.text.clone()))
            }
            Release::HungUp => Ok(None),
            Release::TimedOut => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "timed out after {:?} waiting for output before input #{}",
                    self.timeout, self.cursor
                ),
            )),
        }
    }
}

impl Read for ExpectationSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for ExpectationSource {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buffer.len() {
            self.buffer.clear();
            self.pos = 0;
            if let Some(line) = self.next_line()? {
                self.buffer.extend_from_slice(line.as_bytes());
                self.buffer.push(b'\n');
            }
        }
        Ok(&self.buffer[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buffer.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::Expectation;
    use crate::report::Mismatch;
    use std::io::Write;
    use std::thread;
    use std::time::Instant;

    fn input(text: &str, gate: usize) -> ScriptedInput {
        ScriptedInput {
            text: text.to_string(),
            gate,
        }
    }

    #[test]
    fn test_unbound_read_fails() {
        let mut source = ExpectationSource::new(vec![input("a", 0)]);
        let err = source.read_line(&mut String::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_connect_twice() {
        let sink = ExpectationSink::silent(Vec::new());
        let mut source = ExpectationSource::new(vec![input("a", 0)]);
        source.connect(&sink).unwrap();
        assert_eq!(
            source.connect(&sink),
            Err(BindingError::SourceAlreadyBound)
        );

        let mut other = ExpectationSource::new(vec![input("b", 0)]);
        assert_eq!(other.connect(&sink), Err(BindingError::SinkAlreadyBound));
    }

    #[test]
    fn test_connect_nothing_to_replay() {
        let sink = ExpectationSink::silent(Vec::new());
        let mut source = ExpectationSource::new(Vec::new());
        assert_eq!(source.connect(&sink), Err(BindingError::NothingToReplay));
    }

    #[test]
    fn test_reads_lines_then_end_of_input() {
        let sink = ExpectationSink::silent(Vec::new());
        let mut source = ExpectationSource::new(vec![input("first", 0), input("a\nb", 0)]);
        source.connect(&sink).unwrap();
        assert!(source.is_expecting());

        let lines: Vec<String> = (&mut source).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["first", "a", "b"]);
        assert!(!source.is_expecting());
    }

    #[test]
    fn test_input_waits_for_output() {
        let mut sink = ExpectationSink::silent(vec![Expectation::Integer(1)]);
        let mut source = ExpectationSource::new(vec![input("go", 0), input("next", 1)]);
        source.connect(&sink).unwrap();

        let mut line = String::new();
        source.read_line(&mut line).unwrap();
        assert_eq!(line, "go\n");

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            sink.write_all(b"1\n").unwrap();
            Instant::now()
        });
        line.clear();
        source.read_line(&mut line).unwrap();
        let read_at = Instant::now();
        let written_at = writer.join().unwrap();
        assert_eq!(line, "next\n");
        assert!(read_at >= written_at);
    }

    #[test]
    fn test_handshake_timeout() {
        let sink = ExpectationSink::silent(vec![Expectation::Integer(1)]);
        let mut source =
            ExpectationSource::with_timeout(vec![input("next", 1)], Duration::from_millis(30));
        source.connect(&sink).unwrap();

        let err = source.read_line(&mut String::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(matches!(
            sink.session().mismatches()[..],
            [Mismatch::HandshakeTimeout { input: 0, .. }]
        ));
        assert!(!source.is_expecting());
    }
}
