//! `echo`: prints its startup arguments, one per line, then repeats every input line.

use crate::program::Console;
use anyhow::Result;
use std::io::{BufRead, Write};

pub const NAME: &str = "echo";

pub fn run(args: &[String], console: Console<'_>) -> Result<()> {
    let Console { input, output, .. } = console;
    for arg in args {
        writeln!(output, "{arg}")?;
    }
    for line in input.lines() {
        writeln!(output, "{}", line?)?;
    }
    output.flush()?;
    Ok(())
}
