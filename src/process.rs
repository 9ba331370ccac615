//! [`ExternalCommand`]: an external executable as the program under test.

use crate::program::{Console, Program};
use anyhow::{Context, Result, anyhow, bail};
use parking_lot::Mutex;
use std::io::{self, BufRead, PipeWriter, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs an external executable as the program under test.
///
/// Scripted input is relayed to the child's stdin and the child's stdout is
/// copied into the console output. Startup arguments from the transcript
/// follow the fixed arguments given here.
///
/// Input the child never read before exiting still counts as pending. The
/// child is killed when the harness aborts the run.
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Program for ExternalCommand {
    fn run(&self, args: &[String], console: Console<'_>) -> Result<()> {
        // Keep a read end of the child's stdin: whatever is left in it once the
        // child is gone was never read.
        let (mut unread_end, stdin) = io::pipe().context("Failed to create stdin pipe")?;
        let child_stdin = unread_end
            .try_clone()
            .context("Failed to clone stdin pipe")?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(args)
            .stdin(child_stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", self.program))?;
        let mut stdout = child.stdout.take().context("Failed to get child stdout")?;
        let child = Arc::new(Mutex::new(child));

        let Console {
            input,
            output,
            hangup,
        } = console;
        {
            let child = child.clone();
            hangup.on_abort(move || {
                debug!("run aborted, killing child");
                let _ = child.lock().kill();
            });
        }

        let (status, unread) = thread::scope(|scope| -> Result<(ExitStatus, usize)> {
            let feeder = scope.spawn(move || feed(input, stdin));

            let copied = io::copy(&mut stdout, output);
            // Child output is closed, so it will not ask for more input.
            hangup.hang_up();
            let status = wait_for_exit(&child);
            let mut leftover = Vec::new();
            let drained = unread_end.read_to_end(&mut leftover);
            let fed = feeder
                .join()
                .map_err(|_| anyhow!("input relay thread panicked"))?;

            copied.context("Failed to relay child output")?;
            drained.context("Failed to drain child stdin")?;
            let delivery = fed.context("Failed to relay scripted input")?;
            let status = status.context("Failed to wait for child")?;
            Ok((status, delivery.unread(leftover.len())))
        })?;

        if unread > 0 {
            debug!(unread, "child exited without reading all input");
            hangup.unread(unread);
        }
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// What the relay wrote to the child's stdin, one entry per input chunk.
#[derive(Debug, Default)]
struct Delivery {
    written: Vec<usize>,
    failed: usize,
}

impl Delivery {
    /// Inputs the child never started reading, given the number of bytes
    /// still sitting in its stdin.
    fn unread(&self, mut leftover: usize) -> usize {
        let mut unread = self.failed;
        for &len in self.written.iter().rev() {
            if leftover < len {
                break;
            }
            leftover -= len;
            unread += 1;
        }
        unread
    }
}

/// Relay input to the child until end of input or until the child's stdin
/// can no longer be written.
fn feed(input: &mut (dyn BufRead + Send), mut stdin: PipeWriter) -> io::Result<Delivery> {
    let mut delivery = Delivery::default();
    loop {
        let chunk = input.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        let written = stdin.write_all(chunk).and_then(|_| stdin.flush());
        input.consume(len);
        if let Err(err) = written {
            debug!(error = %err, "child stdin closed");
            delivery.failed += 1;
            break;
        }
        delivery.written.push(len);
    }
    Ok(delivery)
}

fn wait_for_exit(child: &Mutex<Child>) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.lock().try_wait()? {
            return Ok(status);
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}
