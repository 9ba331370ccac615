//! Handshake state shared by an [`ExpectationSource`](crate::ExpectationSource)
//! and the [`ExpectationSink`](crate::ExpectationSink) it is connected to.
//!
//! Release rule: scripted input `k` is handed to the program only once the
//! output cursor has reached the input's gate, the number of expected output
//! lines that precede it in the transcript. The sink advances the cursor and
//! wakes the source after every line it checks.

use crate::error::BindingError;
use crate::report::Mismatch;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type AbortHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct AbortHooks {
    fired: bool,
    hooks: Vec<AbortHook>,
}

#[derive(Debug, Default)]
struct SessionState {
    bound: bool,
    expecting: bool,
    hung_up: bool,
    input_cursor: usize,
    input_total: usize,
    output_cursor: usize,
    mismatches: Vec<Mismatch>,
}

/// Point-in-time view of a session's cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub input_cursor: usize,
    pub input_total: usize,
    /// Output lines checked so far, including unexpected ones.
    pub output_cursor: usize,
    pub expected_total: usize,
    /// The program has not yet been handed every scripted input.
    pub expecting: bool,
}

/// What a blocked input read woke up to.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Release {
    Ready,
    HungUp,
    TimedOut,
}

pub struct Session {
    state: Mutex<SessionState>,
    released: Condvar,
    expected_total: usize,
    abort_hooks: Mutex<AbortHooks>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.lock())
            .field("expected_total", &self.expected_total)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(expected_total: usize) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            released: Condvar::new(),
            expected_total,
            abort_hooks: Mutex::new(AbortHooks::default()),
        }
    }

    /// Claim the sink side for a source with `input_total` scripted lines.
    pub(crate) fn bind(&self, input_total: usize) -> Result<(), BindingError> {
        let mut state = self.state.lock();
        if state.bound {
            return Err(BindingError::SinkAlreadyBound);
        }
        state.bound = true;
        state.expecting = true;
        state.input_total = input_total;
        Ok(())
    }

    /// Block until input `index` may be released, the session is hung up, or
    /// `timeout` elapses. A timeout ends the session: later reads see end of input.
    ///
    /// A hang-up leaves the input unconsumed, so the session keeps expecting it.
    pub(crate) fn wait_for_gate(&self, index: usize, gate: usize, timeout: Duration) -> Release {
        let mut state = self.state.lock();
        if state.output_cursor < gate && !state.hung_up {
            debug!(input = index, gate, "waiting for output before releasing input");
        }
        self.released.wait_while_for(
            &mut state,
            |s| s.output_cursor < gate && !s.hung_up,
            timeout,
        );

        if state.hung_up {
            return Release::HungUp;
        }
        if state.output_cursor < gate {
            warn!(input = index, awaiting = state.output_cursor, "handshake timed out");
            let mismatch = Mismatch::HandshakeTimeout {
                input: index,
                awaiting: state.output_cursor,
                waited_ms: timeout.as_millis(),
            };
            state.mismatches.push(mismatch);
            state.expecting = false;
            state.hung_up = true;
            return Release::TimedOut;
        }

        state.input_cursor = index + 1;
        if state.input_cursor >= state.input_total {
            state.expecting = false;
        }
        Release::Ready
    }

    /// Check one output line at the current cursor, advance the cursor, and
    /// wake any blocked input read.
    pub(crate) fn observe_output<F>(&self, judge: F) -> Option<Mismatch>
    where
        F: FnOnce(usize) -> Option<Mismatch>,
    {
        let mut state = self.state.lock();
        let mismatch = judge(state.output_cursor);
        if let Some(m) = &mismatch {
            state.mismatches.push(m.clone());
        }
        state.output_cursor += 1;
        drop(state);
        self.released.notify_all();
        mismatch
    }

    /// Stop releasing input. Blocked and later reads see end of input.
    pub fn hang_up(&self) {
        self.state.lock().hung_up = true;
        self.released.notify_all();
    }

    /// Hang up and run every hook registered with [`Hangup::on_abort`].
    ///
    /// Used when the run has to be cut short, for instance on the run timeout.
    pub fn abort(&self) {
        self.hang_up();
        let hooks = {
            let mut abort = self.abort_hooks.lock();
            abort.fired = true;
            std::mem::take(&mut abort.hooks)
        };
        for hook in hooks {
            hook();
        }
    }

    /// Run `hook` on abort, or right away if the session was already aborted.
    pub(crate) fn on_abort(&self, hook: AbortHook) {
        let mut abort = self.abort_hooks.lock();
        if abort.fired {
            drop(abort);
            hook();
        } else {
            abort.hooks.push(hook);
        }
    }

    /// Take back the last `count` inputs handed out: the program never read them.
    pub(crate) fn unread(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        debug!(count, "inputs handed out but never read");
        state.input_cursor = state.input_cursor.saturating_sub(count);
        state.expecting = true;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            input_cursor: state.input_cursor,
            input_total: state.input_total,
            output_cursor: state.output_cursor,
            expected_total: self.expected_total,
            expecting: state.expecting,
        }
    }

    /// Mismatches recorded so far, in the order observed.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.state.lock().mismatches.clone()
    }
}

/// The program's handle on its session.
///
/// Lets a program declare it will read no more input, for instance because the
/// child process it relays to has exited, and react when the harness aborts
/// the run.
#[derive(Debug, Clone, Default)]
pub struct Hangup(Option<Arc<Session>>);

impl Hangup {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self(Some(session))
    }

    /// A handle that does nothing, for consoles not backed by a session.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn hang_up(&self) {
        if let Some(session) = &self.0 {
            session.hang_up();
        }
    }

    /// Call `hook` when the harness aborts the run. Dropped without a session.
    pub fn on_abort<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(session) = &self.0 {
            session.on_abort(Box::new(hook));
        }
    }

    /// Report that the last `count` inputs read from the console never reached
    /// the program, so they still count as pending.
    pub fn unread(&self, count: usize) {
        if let Some(session) = &self.0 {
            session.unread(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_bind_once() {
        let session = Session::new(0);
        assert_eq!(session.bind(1), Ok(()));
        assert_eq!(session.bind(1), Err(BindingError::SinkAlreadyBound));
        assert!(session.snapshot().expecting);
    }

    #[test]
    fn test_gate_already_open() {
        let session = Session::new(0);
        session.bind(2).unwrap();
        assert_eq!(
            session.wait_for_gate(0, 0, Duration::from_millis(10)),
            Release::Ready
        );
        assert!(session.snapshot().expecting);
        assert_eq!(
            session.wait_for_gate(1, 0, Duration::from_millis(10)),
            Release::Ready
        );
        assert!(!session.snapshot().expecting);
    }

    #[test]
    fn test_gate_opens_on_output() {
        let session = Arc::new(Session::new(1));
        session.bind(1).unwrap();
        let writer = {
            let session = session.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                session.observe_output(|_| None);
            })
        };
        let started = Instant::now();
        assert_eq!(
            session.wait_for_gate(0, 1, Duration::from_secs(5)),
            Release::Ready
        );
        assert!(started.elapsed() >= Duration::from_millis(50));
        writer.join().unwrap();
    }

    #[test]
    fn test_gate_timeout_records_mismatch() {
        let session = Session::new(1);
        session.bind(1).unwrap();
        assert_eq!(
            session.wait_for_gate(0, 1, Duration::from_millis(20)),
            Release::TimedOut
        );
        assert!(matches!(
            session.mismatches()[..],
            [Mismatch::HandshakeTimeout {
                input: 0,
                awaiting: 0,
                ..
            }]
        ));
        assert!(!session.snapshot().expecting);
        // A timed out session releases nothing more.
        assert_eq!(
            session.wait_for_gate(0, 0, Duration::from_millis(20)),
            Release::HungUp
        );
    }

    #[test]
    fn test_hang_up_wakes_reader() {
        let session = Arc::new(Session::new(1));
        session.bind(1).unwrap();
        let hangup = Hangup::new(session.clone());
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            hangup.hang_up();
        });
        assert_eq!(
            session.wait_for_gate(0, 1, Duration::from_secs(5)),
            Release::HungUp
        );
        handle.join().unwrap();
        assert!(session.mismatches().is_empty());
        // The input was never handed out, so it is still pending.
        assert!(session.snapshot().expecting);
    }

    #[test]
    fn test_abort_runs_hooks_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let session = Arc::new(Session::new(0));
        let hangup = Hangup::new(session.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        hangup.on_abort(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        session.hang_up();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        session.abort();
        session.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Registered after the abort: runs right away.
        let counter = calls.clone();
        hangup.on_abort(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unread_restores_pending_input() {
        let session = Session::new(0);
        session.bind(2).unwrap();
        session.wait_for_gate(0, 0, Duration::from_millis(10));
        session.wait_for_gate(1, 0, Duration::from_millis(10));
        assert!(!session.snapshot().expecting);

        session.unread(2);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.input_cursor, 0);
        assert!(snapshot.expecting);
    }

    #[test]
    fn test_observe_output_advances_cursor() {
        let session = Session::new(1);
        let mismatch = session.observe_output(|index| {
            Some(Mismatch::Unexpected {
                index,
                actual: "x".into(),
            })
        });
        assert!(mismatch.is_some());
        assert_eq!(session.snapshot().output_cursor, 1);
        assert_eq!(session.mismatches().len(), 1);
    }
}
