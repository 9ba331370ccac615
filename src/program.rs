//! The [`Program`] trait, the [`Console`] a program runs against, and the
//! registry of programs the harness can test by name.

use crate::programs::{calc, echo};
use crate::session::Hangup;
use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// The console channels of one program run.
///
/// Programs read their input from `input` and write their output to `output`
/// instead of touching the process-wide standard streams.
pub struct Console<'a> {
    pub input: &'a mut (dyn BufRead + Send),
    pub output: &'a mut (dyn Write + Send),
    /// Lets a program end the scripted session early.
    pub hangup: Hangup,
}

impl<'a> Console<'a> {
    pub fn new(input: &'a mut (dyn BufRead + Send), output: &'a mut (dyn Write + Send)) -> Self {
        Self {
            input,
            output,
            hangup: Hangup::none(),
        }
    }

    pub fn with_hangup(mut self, hangup: Hangup) -> Self {
        self.hangup = hangup;
        self
    }
}

/// An interactive console program the harness can drive.
///
/// Plain functions with the [`EntryFn`] signature are programs; implement the
/// trait directly for programs that carry state. To make a program reachable
/// by name, add one entry to the registry in this module.
pub trait Program: Send + Sync {
    /// Run to completion with the given startup arguments.
    fn run(&self, args: &[String], console: Console<'_>) -> Result<()>;
}

/// Signature of a program's entry point.
pub type EntryFn = fn(&[String], Console<'_>) -> Result<()>;

impl Program for EntryFn {
    fn run(&self, args: &[String], console: Console<'_>) -> Result<()> {
        (*self)(args, console)
    }
}

static REGISTRY: &[(&str, EntryFn)] = &[(calc::NAME, calc::run), (echo::NAME, echo::run)];

/// Find a registered program by name.
pub fn lookup(name: &str) -> Option<Arc<dyn Program>> {
    REGISTRY
        .iter()
        .find(|(program_name, _)| *program_name == name)
        .map(|(_, entry)| Arc::new(*entry) as Arc<dyn Program>)
}

/// Names of all registered programs.
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}
