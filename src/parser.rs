//! Transcript parser.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::error::ParseError;
use crate::expectation::Expectation;
use crate::transcript::{Transcript, TranscriptCase};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

/// `<expected> : "<input>"`
static CASE_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^(null|00err|true|false|-?[0-9]+\.[0-9]+|-?[0-9]+|"[^"]+")\s:\s"([^"]+)"$"#)
        .ok()
});

/// `<"a.txt";"b/c">`
static ARGS_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^<("[\w\\/:_.-]+"(?:;"[\w\\/:_.-]+")*)>$"#).ok()
});

/// Parse a transcript from a string slice.
///
/// Lines that are empty or start with `#` are ignored. A quoted token left
/// open at the end of a line continues on the next one, with the line break
/// kept as a `\n`.
///
/// # Errors
///
/// Fails on the first line that fits neither the case nor the startup-argument
/// grammar, on startup arguments anywhere but the first line, and on a
/// transcript without a single case.
///
/// # Example
///
/// ```
/// use expectio::parse_str;
///
/// let transcript = parse_str("42 : \"6*7\"\ntrue : \"isAnswer 42\"\n").unwrap();
/// assert_eq!(transcript.cases.len(), 2);
/// ```
pub fn parse_str(content: &str) -> Result<Transcript, ParseError> {
    let mut transcript = Transcript::default();
    let mut lines = content.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line_num = index + 1;
        let mut line = raw.trim().to_string();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        while has_open_quote(&line) {
            let (_, next) = lines
                .next()
                .ok_or(ParseError::UnterminatedQuote { line: line_num })?;
            line.push_str("\\n");
            line.push_str(next.trim_end());
        }

        if let Some(caps) = captures(&ARGS_LINE, &line) {
            if transcript.args.is_some() {
                return Err(ParseError::DuplicateArgs { line: line_num });
            }
            if !transcript.cases.is_empty() {
                return Err(ParseError::MisplacedArgs { line: line_num });
            }
            transcript.args = Some(parse_args(&caps[1]));
            continue;
        }

        let caps = captures(&CASE_LINE, &line).ok_or_else(|| ParseError::Malformed {
            line: line_num,
            text: line.clone(),
        })?;
        let expected = match &caps[1] {
            "null" => None,
            token => Some(
                token
                    .parse::<Expectation>()
                    .map_err(|source| ParseError::InvalidValue {
                        line: line_num,
                        source,
                    })?,
            ),
        };
        let input = caps[2].replace("\\n", "\n");
        transcript.cases.push(TranscriptCase::new(input, expected));
    }

    if transcript.cases.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(transcript)
}

/// Parse a transcript from a file.
///
/// Reads the entire file into memory and delegates to [`parse_str`].
///
/// # Example
///
/// ```no_run
/// use expectio::parse_file;
///
/// let transcript = parse_file("tests/calc.test").unwrap();
/// ```
pub fn parse_file(path: impl AsRef<Path>) -> Result<Transcript, ParseError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_str(&content)
}

fn captures<'h>(re: &LazyLock<Option<Regex>>, line: &'h str) -> Option<Captures<'h>> {
    let re: &Option<Regex> = re;
    re.as_ref()?.captures(line)
}

fn has_open_quote(line: &str) -> bool {
    line.matches('"').count() % 2 == 1
}

/// Split `"a";"b"` into its unquoted tokens.
fn parse_args(list: &str) -> Vec<String> {
    list.split(';')
        .map(|token| token.trim_matches('"').to_string())
        .collect()
}
