// Response values seen by conditionals

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Results of one dispatched batch, one entry per command in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response {
    entries: Vec<Value>,
}

impl Response {
    pub fn new(entries: Vec<Value>) -> Self {
        Response { entries }
    }

    /// Build a response from plain text outputs
    pub fn from_text<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Response {
            entries: outputs.into_iter().map(|s| Value::String(s.into())).collect(),
        }
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: Value) {
        self.entries.push(entry);
    }

    /// Joined text form used by the bare `result` operand
    pub fn joined(&self) -> String {
        self.entries
            .iter()
            .map(text_of)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Split each entry into display lines
    pub fn to_lines(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|entry| text_of(entry).split('\n').map(str::to_string).collect())
            .collect()
    }
}

/// Text form of a response value: strings as-is, anything else as compact JSON
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Why a conditional could not be evaluated against a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("index {index} out of range for {len} result(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("key '{0}' not found")]
    MissingKey(String),

    #[error("cannot select {selector} from a {kind} value")]
    NotIndexable { selector: String, kind: &'static str },
}

/// Outcome of checking one conditional against one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    /// The operand could not be resolved; treated as not satisfied
    Unevaluable(EvalError),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
