// Conditional parser for wait_for expressions

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use regex::RegexBuilder;

use super::ast::{Conditional, Literal, Operand, Operator, PathSegment};
use crate::output::errors::VyosError;

#[derive(Parser)]
#[grammar = "parser/conditional.pest"]
pub struct ConditionalParser;

const SYNTAX_HINT: &str =
    "Expected <operand> [not] <operator> <value>, e.g. result[0] contains 'VyOS 1.3.0'";

const OPERATORS: &str = "eq, ==, neq, ne, !=, gt, >, ge, >=, lt, <, le, <=, contains, matches";

/// Compile a wait_for expression into a [`Conditional`]
///
/// Compilation is purely local: nothing here talks to a device, so a poll
/// can reject a bad expression before any command is sent.
pub fn parse_conditional(input: &str) -> Result<Conditional, VyosError> {
    let mut pairs = ConditionalParser::parse(Rule::conditional, input).map_err(|e| {
        malformed(
            input,
            format!("failed to parse conditional: {}", e.variant.message()),
            Some(SYNTAX_HINT.to_string()),
        )
    })?;

    let root = pairs
        .next()
        .ok_or_else(|| malformed(input, "empty conditional", Some(SYNTAX_HINT.to_string())))?;

    let mut operand = None;
    let mut negate = false;
    let mut operator = None;
    let mut literal = None;

    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::operand => operand = Some(parse_operand(pair)?),
            Rule::negation => negate = true,
            Rule::operator => operator = Some(parse_operator(input, pair.as_str())?),
            Rule::single_quoted | Rule::double_quoted => {
                let text = pair
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                literal = Some((Literal::String(text.clone()), text));
            }
            Rule::bare => {
                let word = pair.as_str();
                literal = Some((cast_literal(word), word.to_string()));
            }
            _ => {}
        }
    }

    let (operand, operator, (literal, literal_text)) = match (operand, operator, literal) {
        (Some(o), Some(op), Some(l)) => (o, op, l),
        _ => {
            return Err(malformed(
                input,
                "incomplete conditional",
                Some(SYNTAX_HINT.to_string()),
            ))
        }
    };

    if operator.is_numeric() && literal.as_f64().is_none() {
        return Err(malformed(
            input,
            format!("numeric comparison against non-numeric value '{}'", literal),
            Some("Use eq/neq/contains to compare text".to_string()),
        ));
    }

    let pattern = if operator == Operator::Matches {
        let compiled = RegexBuilder::new(&literal_text)
            .multi_line(true)
            .build()
            .map_err(|e| malformed(input, format!("invalid regular expression: {}", e), None))?;
        Some(compiled)
    } else {
        None
    };

    Ok(Conditional {
        raw: input.to_string(),
        operand,
        operator,
        negate,
        literal,
        literal_text,
        pattern,
    })
}

/// Compile every expression, failing on the first malformed one
pub fn parse_conditionals<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Conditional>, VyosError> {
    inputs
        .iter()
        .map(|s| parse_conditional(s.as_ref()))
        .collect()
}

fn parse_operand(pair: Pair<Rule>) -> Result<Operand, VyosError> {
    let raw = pair.as_str().to_string();
    let mut path = Vec::new();

    for selector in pair.into_inner() {
        let inner = selector.into_inner().next();
        let segment = match inner {
            Some(p) if p.as_rule() == Rule::number => {
                let index = p.as_str().parse::<usize>().map_err(|e| {
                    malformed(&raw, format!("invalid index '{}': {}", p.as_str(), e), None)
                })?;
                PathSegment::Index(index)
            }
            Some(p) => PathSegment::Key(p.as_str().to_string()),
            // Empty quoted key: ['']
            None => PathSegment::Key(String::new()),
        };
        path.push(segment);
    }

    Ok(Operand { path })
}

fn parse_operator(input: &str, token: &str) -> Result<Operator, VyosError> {
    if let Some(op) = Operator::from_token(token) {
        return Ok(op);
    }

    if token.starts_with('[') || token.starts_with('.') {
        return Err(malformed(
            input,
            format!("invalid operand selector '{}'", token),
            Some("Index with a non-negative integer, e.g. result[0]".to_string()),
        ));
    }

    Err(malformed(
        input,
        format!("unknown operator: {}", token),
        Some(format!("Supported operators: {}", OPERATORS)),
    ))
}

/// Cast a bare (unquoted) literal word
fn cast_literal(word: &str) -> Literal {
    match word.to_lowercase().as_str() {
        "true" | "yes" | "on" => return Literal::Bool(true),
        "false" | "no" | "off" => return Literal::Bool(false),
        _ => {}
    }

    if let Ok(i) = word.parse::<i64>() {
        return Literal::Int(i);
    }
    if word.contains('.') {
        if let Ok(f) = word.parse::<f64>() {
            return Literal::Float(f);
        }
    }

    Literal::String(word.to_string())
}

fn malformed(input: &str, message: impl Into<String>, suggestion: Option<String>) -> VyosError {
    let mut err = VyosError::conditional(input, message);
    if let VyosError::Conditional { suggestion: ref mut hint, .. } = err {
        *hint = suggestion;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contains_with_index() {
        let cond = parse_conditional("result[0] contains 'VyOS 1.3.0'").unwrap();
        assert_eq!(cond.operand, Operand::index(0));
        assert_eq!(cond.operator, Operator::Contains);
        assert_eq!(cond.literal, Literal::String("VyOS 1.3.0".to_string()));
        assert!(!cond.negate);
        assert_eq!(cond.raw, "result[0] contains 'VyOS 1.3.0'");
        assert_eq!(cond.literal_text, "VyOS 1.3.0");
    }

    #[test]
    fn test_float_literal_text_is_verbatim() {
        let cond = parse_conditional("result[0] contains 1.0").unwrap();
        assert_eq!(cond.literal, Literal::Float(1.0));
        assert_eq!(cond.literal_text, "1.0");
    }

    #[test]
    fn test_whole_result_operand() {
        let cond = parse_conditional("result contains eth0").unwrap();
        assert!(cond.operand.is_whole());
        assert_eq!(cond.literal, Literal::String("eth0".to_string()));
    }

    #[test]
    fn test_nested_selectors() {
        let cond = parse_conditional("result[1]['interfaces'].eth0 == \"up\"").unwrap();
        assert_eq!(
            cond.operand.path,
            vec![
                PathSegment::Index(1),
                PathSegment::Key("interfaces".to_string()),
                PathSegment::Key("eth0".to_string()),
            ]
        );
        assert_eq!(cond.literal, Literal::String("up".to_string()));
    }

    #[test]
    fn test_negation() {
        let cond = parse_conditional("result[0] not contains 'error'").unwrap();
        assert!(cond.negate);
        assert_eq!(cond.operator, Operator::Contains);
    }

    #[test]
    fn test_bare_literal_casting() {
        assert_eq!(
            parse_conditional("result[0] > 5").unwrap().literal,
            Literal::Int(5)
        );
        assert_eq!(
            parse_conditional("result[0] le 2.5").unwrap().literal,
            Literal::Float(2.5)
        );
        assert_eq!(
            parse_conditional("result[0].enabled eq true").unwrap().literal,
            Literal::Bool(true)
        );
        // Quoted numbers stay strings
        assert_eq!(
            parse_conditional("result[0] eq '5'").unwrap().literal,
            Literal::String("5".to_string())
        );
    }

    #[test]
    fn test_unknown_operator_is_malformed() {
        let err = parse_conditional("result[0] frobnicate 'x'").unwrap_err();
        match err {
            VyosError::Conditional { message, expression, .. } => {
                assert_eq!(message, "unknown operator: frobnicate");
                assert_eq!(expression, "result[0] frobnicate 'x'");
            }
            other => panic!("Expected Conditional error, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_quote_is_malformed() {
        assert!(parse_conditional("result[0] contains 'VyOS").is_err());
        assert!(parse_conditional("result[0] contains \"VyOS").is_err());
    }

    #[test]
    fn test_bad_index_is_malformed() {
        let err = parse_conditional("result[x] up").unwrap_err();
        assert!(err.summary().contains("invalid operand selector"));
        assert!(parse_conditional("result[x] eq 1").is_err());
        assert!(parse_conditional("result[-1] eq 1").is_err());
    }

    #[test]
    fn test_missing_parts_are_malformed() {
        assert!(parse_conditional("").is_err());
        assert!(parse_conditional("result[0]").is_err());
        assert!(parse_conditional("result[0] eq").is_err());
        assert!(parse_conditional("output[0] eq 1").is_err());
        assert!(parse_conditional("result[0] eq 'a' 'b'").is_err());
    }

    #[test]
    fn test_numeric_operator_requires_number() {
        let err = parse_conditional("result[0] > abc").unwrap_err();
        assert!(err.summary().contains("non-numeric"));
    }

    #[test]
    fn test_matches_compiles_regex() {
        let cond = parse_conditional(r"result[0] matches '^Version:\s+VyOS'").unwrap();
        assert!(cond.pattern.is_some());

        assert!(parse_conditional("result[0] matches '(unclosed'").is_err());
    }

    #[test]
    fn test_parse_conditionals_fails_fast() {
        let ok = parse_conditionals(&["result[0] contains 'a'", "result[1] eq 2"]).unwrap();
        assert_eq!(ok.len(), 2);

        let err = parse_conditionals(&["result[0] contains 'a'", "result[1] ~ 2"]);
        assert!(err.is_err());
    }
}
