// Runtime module - conditional evaluation against device responses

mod types;

pub use types::*;

use serde_json::Value;

use crate::parser::ast::{Conditional, Literal, Operand, Operator, PathSegment};

/// Evaluate a conditional against a response
///
/// Unevaluable conditionals (bad index, missing key) are simply false.
pub fn evaluate(cond: &Conditional, response: &Response) -> bool {
    check(cond, response).is_passed()
}

/// Evaluate a conditional, keeping the reason when it cannot be evaluated
pub fn check(cond: &Conditional, response: &Response) -> Outcome {
    let value = match resolve(&cond.operand, response) {
        Ok(v) => v,
        Err(e) => return Outcome::Unevaluable(e),
    };

    let passed = apply(cond, &value);
    if passed != cond.negate {
        Outcome::Passed
    } else {
        Outcome::Failed
    }
}

/// Resolve an operand path to a value inside the response
pub fn resolve(operand: &Operand, response: &Response) -> Result<Value, EvalError> {
    let mut segments = operand.path.iter();

    let mut current = match segments.next() {
        None => return Ok(Value::String(response.joined())),
        Some(PathSegment::Index(i)) => {
            response
                .entries()
                .get(*i)
                .cloned()
                .ok_or(EvalError::IndexOutOfRange {
                    index: *i,
                    len: response.len(),
                })?
        }
        Some(PathSegment::Key(k)) => {
            return Err(EvalError::NotIndexable {
                selector: format!("'{}'", k),
                kind: "list",
            })
        }
    };

    for segment in segments {
        current = match (segment, &current) {
            (PathSegment::Index(i), Value::Array(items)) => {
                items
                    .get(*i)
                    .cloned()
                    .ok_or(EvalError::IndexOutOfRange {
                        index: *i,
                        len: items.len(),
                    })?
            }
            (PathSegment::Key(k), Value::Object(map)) => map
                .get(k)
                .cloned()
                .ok_or_else(|| EvalError::MissingKey(k.clone()))?,
            (PathSegment::Index(i), other) => {
                return Err(EvalError::NotIndexable {
                    selector: format!("[{}]", i),
                    kind: kind_of(other),
                })
            }
            (PathSegment::Key(k), other) => {
                return Err(EvalError::NotIndexable {
                    selector: format!("'{}'", k),
                    kind: kind_of(other),
                })
            }
        };
    }

    Ok(current)
}

fn apply(cond: &Conditional, value: &Value) -> bool {
    match cond.operator {
        Operator::Eq => equals(value, &cond.literal),
        Operator::Neq => !equals(value, &cond.literal),
        Operator::Gt => compare_numbers(value, &cond.literal, |a, b| a > b),
        Operator::Ge => compare_numbers(value, &cond.literal, |a, b| a >= b),
        Operator::Lt => compare_numbers(value, &cond.literal, |a, b| a < b),
        Operator::Le => compare_numbers(value, &cond.literal, |a, b| a <= b),
        Operator::Contains => contains(value, &cond.literal_text),
        Operator::Matches => cond
            .pattern
            .as_ref()
            .map(|re| re.is_match(&text_of(value)))
            .unwrap_or(false),
    }
}

fn equals(value: &Value, literal: &Literal) -> bool {
    match literal {
        Literal::String(s) => text_of(value) == *s,
        Literal::Int(_) | Literal::Float(_) => match (as_number(value), literal.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
        Literal::Bool(b) => match value {
            Value::Bool(v) => v == b,
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" => *b,
                "false" | "no" | "off" => !*b,
                _ => false,
            },
            _ => false,
        },
    }
}

fn compare_numbers<F>(value: &Value, literal: &Literal, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (as_number(value), literal.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| text_of(item) == needle),
        Value::Object(map) => map.contains_key(needle),
        other => text_of(other).contains(needle),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_conditional;
    use serde_json::json;

    fn show_version() -> Response {
        Response::from_text([
            "Version:          VyOS 1.3.0\nRelease train:    equuleus",
            "CPU(s): 4",
        ])
    }

    fn eval(expr: &str, response: &Response) -> bool {
        evaluate(&parse_conditional(expr).unwrap(), response)
    }

    #[test]
    fn test_contains_on_indexed_entry() {
        let response = show_version();
        assert!(eval("result[0] contains 'VyOS 1.3.0'", &response));
        assert!(!eval("result[1] contains 'VyOS 1.3.0'", &response));
        assert!(eval("result contains 'CPU(s)'", &response));
    }

    #[test]
    fn test_eq_and_neq() {
        let response = Response::from_text(["up", "42"]);
        assert!(eval("result[0] eq up", &response));
        assert!(eval("result[0] == 'up'", &response));
        assert!(eval("result[0] != 'down'", &response));
        assert!(!eval("result[0] neq 'up'", &response));
        // Numeric literal compares numerically against numeric text
        assert!(eval("result[1] eq 42", &response));
        assert!(eval("result[1] eq 42.0", &response));
        assert!(!eval("result[0] eq 42", &response));
    }

    #[test]
    fn test_numeric_comparisons() {
        let response = Response::new(vec![json!(" 15 "), json!(3.5), json!("n/a")]);
        assert!(eval("result[0] > 10", &response));
        assert!(eval("result[0] >= 15", &response));
        assert!(!eval("result[0] < 15", &response));
        assert!(eval("result[1] le 3.5", &response));
        assert!(eval("result[1] lt 4", &response));
        // Coercion failure is false, never an error
        assert!(!eval("result[2] > 0", &response));
        assert!(!eval("result[2] <= 0", &response));
    }

    #[test]
    fn test_index_out_of_range_is_unevaluable() {
        let response = Response::from_text(["a", "b"]);
        let cond = parse_conditional("result[5] eq 'x'").unwrap();

        assert_eq!(
            check(&cond, &response),
            Outcome::Unevaluable(EvalError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert!(!evaluate(&cond, &response));

        // Negation does not turn an unevaluable conditional into a pass
        assert!(!eval("result[5] not eq 'x'", &response));
    }

    #[test]
    fn test_negation() {
        let response = show_version();
        assert!(eval("result[0] not contains 'error'", &response));
        assert!(!eval("result[0] not contains 'VyOS'", &response));
    }

    #[test]
    fn test_matches() {
        let response = show_version();
        assert!(eval(r"result[0] matches '^Release train:\s+equuleus$'", &response));
        assert!(!eval("result[0] matches '^sagitta'", &response));
    }

    #[test]
    fn test_structured_navigation() {
        let response = Response::new(vec![json!({
            "interfaces": {"eth0": {"state": "up", "mtu": 1500}},
            "addresses": ["192.0.2.1/24", "2001:db8::1/64"],
            "enabled": true
        })]);

        assert!(eval("result[0].interfaces.eth0.state eq up", &response));
        assert!(eval("result[0]['interfaces']['eth0']['mtu'] >= 1500", &response));
        assert!(eval("result[0].addresses contains '192.0.2.1/24'", &response));
        assert!(eval("result[0].addresses[1] contains 'db8'", &response));
        assert!(eval("result[0].interfaces contains eth0", &response));
        assert!(eval("result[0].enabled eq true", &response));

        let missing = parse_conditional("result[0].interfaces.eth9.state eq up").unwrap();
        assert_eq!(
            check(&missing, &response),
            Outcome::Unevaluable(EvalError::MissingKey("eth9".to_string()))
        );

        let scalar = parse_conditional("result[0].enabled[0] eq 1").unwrap();
        assert!(matches!(
            check(&scalar, &response),
            Outcome::Unevaluable(EvalError::NotIndexable { kind: "boolean", .. })
        ));
    }

    #[test]
    fn test_contains_float_literal_keeps_written_form() {
        let response = Response::from_text(["VyOS 1.3.1 build 12"]);
        assert!(!eval("result[0] contains 1.0", &response));
        assert!(!eval("result[0] matches 1.0", &response));

        let response = Response::from_text(["mtu 1.0 ratio"]);
        assert!(eval("result[0] contains 1.0", &response));

        let response = Response::new(vec![json!(["2.50", "3"])]);
        assert!(eval("result[0] contains 2.50", &response));
        assert!(!eval("result[0] contains 2.5", &response));
    }

    #[test]
    fn test_bool_literal_against_text() {
        let response = Response::from_text(["yes"]);
        assert!(eval("result[0] eq true", &response));
        assert!(!eval("result[0] eq false", &response));
    }
}
