//! # Expectio
//!
//! A transcript-driven test harness for interactive, line-oriented console
//! programs.
//!
//! A transcript describes a whole interactive session: which lines the program
//! reads and which line it must print after each of them. Expectio replays the
//! transcript against the program through an input source and an output sink
//! that replace its console, releasing each scripted line only once the
//! outputs that precede it have been printed, and reports every divergence.
//!
//! ## Quick start
//!
//! ```no_run
//! use expectio::{HarnessConfig, Runner, lookup, parse_str};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transcript = parse_str(r#"
//! # the calculator answers every question
//! 42 : "6*7"
//! true : "isAnswer 42"
//! "#)?;
//!
//!     let runner = Runner::new(HarnessConfig::default());
//!     let program = lookup("calc").expect("calc is registered");
//!     let report = runner.run(program, &transcript, None).await?;
//!     assert!(report.passed());
//!     Ok(())
//! }
//! ```
//!
//! ## Transcript syntax
//!
//! | Line | Meaning |
//! |------|---------|
//! | `<"a.txt";"b/c">` | Startup arguments; only allowed as the first line |
//! | `42 : "6*7"` | Send `6*7`, then expect the integer `42` |
//! | `-0.5 : "avg -1 0"` | Expect a decimal, compared numerically |
//! | `true : "isAnswer 42"` | Expect `true` or `false` |
//! | `"OK" : "save"` | Expect the exact text `OK` |
//! | `00err : "1/0"` | Expect an error line, one starting with `Error` |
//! | `null : "reset"` | Send `reset` and expect no output |
//! | `# comment` | Full-line comment |
//!
//! A quoted token may span several lines; the line breaks are kept. Lines
//! starting with `$Error: ` or `Test: ` are the harness's own narration and are
//! never matched.
//!
//! ## Testing your own program
//!
//! Programs receive their console as a [`Console`] instead of using the
//! process-wide standard streams. Any function with the [`program::EntryFn`]
//! signature is a [`Program`]:
//!
//! ```no_run
//! use expectio::{Console, Program};
//! use std::io::{BufRead, Write};
//!
//! fn shout(_args: &[String], console: Console<'_>) -> anyhow::Result<()> {
//!     let Console { input, output, .. } = console;
//!     for line in input.lines() {
//!         writeln!(output, "{}", line?.to_uppercase())?;
//!     }
//!     Ok(())
//! }
//!
//! let program: std::sync::Arc<dyn Program> =
//!     std::sync::Arc::new(shout as expectio::program::EntryFn);
//! ```
//!
//! External executables are driven through [`ExternalCommand`].

pub mod config;
pub mod error;
pub mod expectation;
pub mod parser;
pub mod process;
pub mod program;
pub mod programs;
pub mod report;
pub mod runner;
pub mod session;
pub mod sink;
pub mod source;
pub mod suite;
pub mod transcript;

pub use config::HarnessConfig;
pub use error::{BindingError, HarnessError, ParseError, SuiteError};
pub use expectation::Expectation;
pub use parser::{parse_file, parse_str};
pub use process::ExternalCommand;
pub use program::{Console, Program, lookup};
pub use report::{FileReport, Mismatch};
pub use runner::Runner;
pub use session::{Hangup, Session};
pub use sink::ExpectationSink;
pub use source::ExpectationSource;
pub use suite::{FileOutcome, Suite, SuiteSummary};
pub use transcript::{Transcript, TranscriptCase};
