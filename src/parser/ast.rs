// Abstract Syntax Tree types for wait_for conditionals

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Operand
// ============================================================================

/// One step of an operand path after the `result` root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `[N]` - positional index into a list
    Index(usize),
    /// `['key']`, `["key"]` or `.key` - key into a JSON object
    Key(String),
}

/// The left-hand side of a conditional (`result`, `result[0]`, `result[1].data`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Operand {
    pub path: Vec<PathSegment>,
}

impl Operand {
    /// The bare `result` operand - the whole response
    pub fn whole() -> Self {
        Operand::default()
    }

    pub fn index(i: usize) -> Self {
        Operand {
            path: vec![PathSegment::Index(i)],
        }
    }

    pub fn is_whole(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "result")?;
        for seg in &self.path {
            match seg {
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
                PathSegment::Key(k) => write!(f, "['{}']", k)?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// Operator and literal
// ============================================================================

/// Comparison operators supported in conditionals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    Matches,
}

impl Operator {
    /// Map an operator token (including aliases) to an operator
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "eq" | "==" => Operator::Eq,
            "neq" | "ne" | "!=" => Operator::Neq,
            "gt" | ">" => Operator::Gt,
            "ge" | ">=" => Operator::Ge,
            "lt" | "<" => Operator::Lt,
            "le" | "<=" => Operator::Le,
            "contains" => Operator::Contains,
            "matches" => Operator::Matches,
            _ => return None,
        };
        Some(op)
    }

    /// Whether the operand is coerced to a number
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }
}

/// Right-hand side of a conditional
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::String(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Compiled conditional
// ============================================================================

/// A compiled wait_for conditional
///
/// Built once by [`crate::parser::parse_conditional`] and evaluated against
/// every response of a poll.
#[derive(Debug, Clone)]
pub struct Conditional {
    /// The expression exactly as the user wrote it
    pub raw: String,
    pub operand: Operand,
    pub operator: Operator,
    /// `not` between operand and operator
    pub negate: bool,
    pub literal: Literal,
    /// The literal as written, without quotes; used for text matching
    pub literal_text: String,
    /// Compiled pattern for `matches`
    pub pattern: Option<Regex>,
}

impl PartialEq for Conditional {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && self.operand == other.operand
            && self.operator == other.operator
            && self.negate == other.negate
            && self.literal == other.literal
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// Match policy
// ============================================================================

/// How the wait_for conditionals combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Every conditional must pass, each on some attempt
    #[default]
    All,
    /// The first passing conditional ends the poll
    Any,
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(MatchPolicy::All),
            "any" => Ok(MatchPolicy::Any),
            other => Err(format!("invalid match policy '{}' (expected all or any)", other)),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::All => write!(f, "all"),
            MatchPolicy::Any => write!(f, "any"),
        }
    }
}
