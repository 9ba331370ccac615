//! `calc`: a small interactive calculator used to demonstrate and test the harness.
//!
//! One command per line, one reply line per command:
//! - `6*7`: integer arithmetic with `+ - * /`
//! - `isAnswer 42`: `true` or `false`
//! - `avg 1 2 4`: the mean as a decimal
//! - `quit`: stop reading input
//!
//! Bad commands print `Error, <reason>` and the session goes on.

use crate::program::Console;
use anyhow::Result;
use std::io::{BufRead, Write};
use thiserror::Error;

pub const NAME: &str = "calc";

const ANSWER: i64 = 42;

#[derive(Debug, Error, PartialEq)]
enum CalcError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("not a number: {0}")]
    NotANumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result out of range")]
    Overflow,
    #[error("avg needs at least one number")]
    NothingToAverage,
}

pub fn run(_args: &[String], console: Console<'_>) -> Result<()> {
    let Console { input, output, .. } = console;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim();
        if command == "quit" {
            break;
        }
        match evaluate(command) {
            Ok(reply) => writeln!(output, "{reply}")?,
            Err(err) => writeln!(output, "Error, {err}")?,
        }
        output.flush()?;
    }
    Ok(())
}

fn evaluate(command: &str) -> Result<String, CalcError> {
    if let Some(arg) = command.strip_prefix("isAnswer ") {
        return Ok((parse_int(arg)? == ANSWER).to_string());
    }
    if let Some(args) = command.strip_prefix("avg") {
        return average(args).map(|mean| mean.to_string());
    }
    arithmetic(command)
}

fn arithmetic(expr: &str) -> Result<String, CalcError> {
    // Skip the first character so a leading minus stays with the left operand.
    let (idx, op) = expr
        .char_indices()
        .skip(1)
        .find(|(_, c)| matches!(c, '+' | '-' | '*' | '/'))
        .ok_or_else(|| CalcError::UnknownCommand(expr.to_string()))?;
    let lhs = parse_int(&expr[..idx])?;
    let rhs = parse_int(&expr[idx + 1..])?;
    let result = match op {
        '+' => lhs.checked_add(rhs),
        '-' => lhs.checked_sub(rhs),
        '*' => lhs.checked_mul(rhs),
        _ if rhs == 0 => return Err(CalcError::DivisionByZero),
        _ => lhs.checked_div(rhs),
    };
    result
        .map(|n| n.to_string())
        .ok_or(CalcError::Overflow)
}

fn average(args: &str) -> Result<f64, CalcError> {
    let values = args
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| CalcError::NotANumber(s.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err(CalcError::NothingToAverage);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn parse_int(s: &str) -> Result<i64, CalcError> {
    let s = s.trim();
    s.parse().map_err(|_| CalcError::NotANumber(s.to_string()))
}
