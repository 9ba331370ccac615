//! [`Runner`]: replays one transcript against one program and judges the run.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::program::{Console, Program};
use crate::report::{FileReport, Mismatch};
use crate::session::{Hangup, Session};
use crate::sink::{ExpectationSink, OutputHandler};
use crate::source::ExpectationSource;
use crate::transcript::Transcript;
use anyhow::Context as _;
use std::any::Any;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{info, warn};

/// Replays one transcript against one program.
pub struct Runner {
    config: HarnessConfig,
    output_handler: OutputHandler,
}

impl Runner {
    /// Create a runner that echoes program output to stdout.
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_handler(config, |data| {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(data);
            let _ = stdout.flush();
        })
    }

    /// Create a runner that passes program output to `handler` instead of stdout.
    pub fn with_handler<F>(config: HarnessConfig, handler: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        Self {
            config,
            output_handler: Arc::new(handler),
        }
    }

    /// Create a runner that discards program output.
    pub fn silent(config: HarnessConfig) -> Self {
        Self::with_handler(config, |_| {})
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `program` against `transcript`, appending its output to `log` if given.
    ///
    /// Mismatches and program failures end up in the returned report; only a
    /// session that cannot be set up at all is an error.
    pub async fn run(
        &self,
        program: Arc<dyn Program>,
        transcript: &Transcript,
        log: Option<&Path>,
    ) -> Result<FileReport, HarnessError> {
        let plan = transcript.plan();
        let mut sink = ExpectationSink::new(plan.expected, self.output_handler.clone());
        if let Some(path) = log {
            let file = File::create(path).map_err(|source| HarnessError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;
            sink = sink.with_log(file);
        }
        let mut source =
            ExpectationSource::with_timeout(plan.inputs, self.config.handshake_timeout);
        source.connect(&sink)?;

        let session = sink.session();
        let args = transcript.args().to_vec();
        info!(
            cases = transcript.len(),
            expected = session.snapshot().expected_total,
            args = ?args,
            "running transcript"
        );

        let hangup = Hangup::new(session.clone());
        let worker = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let console = Console::new(&mut source, &mut sink).with_hangup(hangup);
            let outcome = program.run(&args, console);
            let finished = sink.finish().context("Failed to flush program output");
            outcome.and(finished)
        });

        let invocation_error = match tokio::time::timeout(self.config.run_timeout, worker).await
        {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(err))) => Some(format!("{err:#}")),
            Ok(Err(err)) => Some(describe_join_error(err)),
            Err(_) => {
                session.abort();
                Some(format!(
                    "program still running after {:?}",
                    self.config.run_timeout
                ))
            }
        };
        if let Some(err) = &invocation_error {
            warn!(error = %err, "program failed");
        }

        let report = verdict(&session, invocation_error);
        info!(
            passed = report.passed(),
            mismatches = report.mismatches.len(),
            "transcript finished"
        );
        Ok(report)
    }
}

/// Turn the final session state into a report, adding the end-of-run checks.
fn verdict(session: &Session, invocation_error: Option<String>) -> FileReport {
    let snapshot = session.snapshot();
    let mut mismatches = session.mismatches();
    if snapshot.output_cursor != snapshot.expected_total {
        mismatches.push(Mismatch::Count {
            expected: snapshot.expected_total,
            actual: snapshot.output_cursor,
        });
    }
    if snapshot.expecting {
        mismatches.push(Mismatch::PendingInput {
            consumed: snapshot.input_cursor,
            total: snapshot.input_total,
        });
    }
    FileReport {
        mismatches,
        lines_processed: snapshot.output_cursor,
        expected_total: snapshot.expected_total,
        inputs_consumed: snapshot.input_cursor,
        inputs_total: snapshot.input_total,
        invocation_error,
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("program task failed: {err}");
    }
    let payload = err.into_panic();
    format!("program panicked: {}", panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use crate::program::lookup;

    fn runner() -> Runner {
        Runner::silent(HarnessConfig::default())
    }

    #[tokio::test]
    async fn test_clean_run() {
        let transcript = parse_str("42 : \"6*7\"\ntrue : \"isAnswer 42\"\n").unwrap();
        let report = runner()
            .run(lookup("calc").unwrap(), &transcript, None)
            .await
            .unwrap();
        assert!(report.passed(), "{:?}", report.diagnostics());
        assert_eq!(report.lines_processed, 2);
        assert_eq!(report.expected_total, 2);
        assert_eq!(report.inputs_consumed, 2);
    }

    #[tokio::test]
    async fn test_mismatch_is_reported() {
        let transcript = parse_str("41 : \"6*7\"\n00err : \"1/0\"\n").unwrap();
        let report = runner()
            .run(lookup("calc").unwrap(), &transcript, None)
            .await
            .unwrap();
        assert_eq!(
            report.mismatches,
            vec![Mismatch::Output {
                index: 0,
                expected: "41".into(),
                actual: "42".into()
            }]
        );
    }

    fn failing(_args: &[String], _console: Console<'_>) -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }

    fn panicking(_args: &[String], _console: Console<'_>) -> anyhow::Result<()> {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_program_error_is_captured() {
        let transcript = parse_str("null : \"x\"\n").unwrap();
        let program: Arc<dyn Program> = Arc::new(failing as crate::program::EntryFn);
        let report = runner().run(program, &transcript, None).await.unwrap();
        assert_eq!(report.invocation_error.as_deref(), Some("boom"));
        assert!(matches!(
            report.mismatches[..],
            [Mismatch::PendingInput {
                consumed: 0,
                total: 1
            }]
        ));
    }

    #[tokio::test]
    async fn test_program_panic_is_captured() {
        let transcript = parse_str("null : \"x\"\n").unwrap();
        let program: Arc<dyn Program> = Arc::new(panicking as crate::program::EntryFn);
        let report = runner().run(program, &transcript, None).await.unwrap();
        assert_eq!(
            report.invocation_error.as_deref(),
            Some("program panicked: kaboom")
        );
    }

    #[tokio::test]
    async fn test_log_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calcTest.log");
        let transcript = parse_str("42 : \"6*7\"\n5 : \"2+2\"\n").unwrap();
        let report = runner()
            .run(lookup("calc").unwrap(), &transcript, Some(&log))
            .await
            .unwrap();
        assert!(!report.passed());
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "42\n4\n$Error: output #1: expected `5`, actual `4`\n"
        );
    }

    #[tokio::test]
    async fn test_unwritable_log_is_an_error() {
        let transcript = parse_str("42 : \"6*7\"\n").unwrap();
        let result = runner()
            .run(
                lookup("calc").unwrap(),
                &transcript,
                Some(Path::new("/nonexistent/expectio/x.log")),
            )
            .await;
        assert!(matches!(result, Err(HarnessError::LogFile { .. })));
    }
}
