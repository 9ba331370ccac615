//! Parsed transcripts and the ordered queues a session replays from them.

use crate::expectation::Expectation;

/// One step of a scripted session: a line of input and the output it must produce.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptCase {
    /// Text delivered to the program. An embedded `\n` delivers several lines.
    pub input: String,
    /// `None` when the transcript says `null`: no output is asserted for this step.
    pub expected: Option<Expectation>,
}

impl TranscriptCase {
    pub fn new(input: impl Into<String>, expected: Option<Expectation>) -> Self {
        Self {
            input: input.into(),
            expected,
        }
    }
}

/// A whole transcript file, in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transcript {
    pub args: Option<Vec<String>>,
    pub cases: Vec<TranscriptCase>,
}

/// A scripted input together with its gate: the number of expected output
/// lines that must have been observed before the input may be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedInput {
    pub text: String,
    pub gate: usize,
}

/// The two independent queues a session is replayed from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionPlan {
    pub inputs: Vec<ScriptedInput>,
    pub expected: Vec<Expectation>,
}

impl Transcript {
    /// Startup arguments, or an empty slice when the transcript has none.
    pub fn args(&self) -> &[String] {
        self.args.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Split the cases into the input queue and the expected-output queue.
    ///
    /// Both keep file order. Input `k` is gated on every output expected by
    /// cases `0..k`, so repeated input texts never collapse into one entry.
    pub fn plan(&self) -> SessionPlan {
        let mut plan = SessionPlan::default();
        for case in &self.cases {
            plan.inputs.push(ScriptedInput {
                text: case.input.clone(),
                gate: plan.expected.len(),
            });
            if let Some(expected) = &case.expected {
                plan.expected.extend(expected.clone().into_lines());
            }
        }
        plan
    }
}
