//! Minimal expression evaluator for condition, transform and code nodes.
//!
//! Supported forms, lowest precedence first:
//!
//! - `left || right`, `left && right`
//! - `left OP right` with `OP` one of `==`, `===`, `!=`, `!==`, `>`, `>=`, `<`, `<=`
//! - `left + right`, `left - right` (`-` must be surrounded by whitespace)
//! - `left * right`, `left / right` (division by zero is `0`)
//! - literals: `true`, `false`, `null`, numbers, quoted strings
//! - property paths resolved against the context (`user.tags[0]`)
//!
//! A bare expression that resolves to nothing evaluates to its own text.
//! Operands that resolve to nothing evaluate to `null`.

use serde_json::{Map, Number, Value};

use super::path::extract_from_map;

const LOGICAL_OR: &[&str] = &["||"];
const LOGICAL_AND: &[&str] = &["&&"];
const COMPARISON: &[&str] = &["===", "!==", "==", "!=", ">=", "<=", ">", "<"];
const ADDITIVE: &[&str] = &["+", "-"];
const MULTIPLICATIVE: &[&str] = &["*", "/"];

/// Operators that only count with whitespace on both sides.
const SPACED: &[&str] = &["-"];

/// Evaluate `expression` against a flat context map.
///
/// Never fails: malformed or unresolvable input degrades to the literal text.
pub fn evaluate(expression: &str, context: &Map<String, Value>) -> Value {
    eval(expression, context, true)
}

/// Truthiness used by condition, filter and boolean operators.
///
/// `null`, `false`, `0`, `""`, `"0"`, and empty arrays/objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn eval(expression: &str, context: &Map<String, Value>, bare: bool) -> Value {
    let expr = expression.trim();

    if let Some(value) = literal(expr) {
        return value;
    }

    if let Some((left, _, right)) = split_operator(expr, LOGICAL_OR, Scan::Leftmost, &[]) {
        let left = eval(left, context, false);
        let right = eval(right, context, false);
        return Value::Bool(is_truthy(&left) || is_truthy(&right));
    }

    if let Some((left, _, right)) = split_operator(expr, LOGICAL_AND, Scan::Leftmost, &[]) {
        let left = eval(left, context, false);
        let right = eval(right, context, false);
        return Value::Bool(is_truthy(&left) && is_truthy(&right));
    }

    if let Some((left, op, right)) = split_operator(expr, COMPARISON, Scan::Leftmost, &[]) {
        let left = eval(left, context, false);
        let right = eval(right, context, false);
        return Value::Bool(compare(&left, op, &right));
    }

    if let Some((left, op, right)) = split_operator(expr, ADDITIVE, Scan::Rightmost, SPACED) {
        let left = eval(left, context, false);
        let right = eval(right, context, false);
        return arithmetic(&left, op, &right);
    }

    if let Some((left, op, right)) = split_operator(expr, MULTIPLICATIVE, Scan::Rightmost, SPACED) {
        let left = eval(left, context, false);
        let right = eval(right, context, false);
        return arithmetic(&left, op, &right);
    }

    match extract_from_map(context, expr) {
        Some(value) => value.clone(),
        None if bare => Value::String(expr.to_string()),
        None => Value::Null,
    }
}

fn literal(expr: &str) -> Option<Value> {
    match expr {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }

    if let Some(inner) = strip_quotes(expr) {
        return Some(Value::String(inner.to_string()));
    }

    parse_number(expr)
}

fn strip_quotes(expr: &str) -> Option<&str> {
    if expr.len() < 2 {
        return None;
    }
    let first = expr.chars().next()?;
    if (first == '"' || first == '\'') && expr.ends_with(first) {
        let inner = &expr[1..expr.len() - 1];
        // `'a' == 'b'` is a comparison, not one literal.
        if !inner.contains(first) {
            return Some(inner);
        }
    }
    None
}

fn parse_number(expr: &str) -> Option<Value> {
    let first = expr.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    if let Ok(i) = expr.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    let f = expr.parse::<f64>().ok()?;
    if !f.is_finite() {
        return None;
    }
    Number::from_f64(f).map(Value::Number)
}

#[derive(Clone, Copy)]
enum Scan {
    Leftmost,
    Rightmost,
}

/// Find an operator outside of quotes and brackets and split around it.
///
/// Operators listed in `spaced` only count if surrounded by whitespace,
/// so hyphenated paths (`my-node`) and negative literals survive.
fn split_operator<'e>(
    expr: &'e str,
    ops: &[&'static str],
    scan: Scan,
    spaced: &[&str],
) -> Option<(&'e str, &'static str, &'e str)> {
    let bytes = expr.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut found: Option<(usize, &'static str)> = None;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => {
                quote = Some(b);
                i += 1;
                continue;
            }
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            _ => {}
        }

        if depth == 0 {
            if let Some(op) = ops.iter().find(|op| bytes[i..].starts_with(op.as_bytes())) {
                let end = i + op.len();
                let needs_space = spaced.contains(op);
                let left_ok = i > 0 && (!needs_space || bytes[i - 1].is_ascii_whitespace());
                let right_ok =
                    end < bytes.len() && (!needs_space || bytes[end].is_ascii_whitespace());
                if left_ok && right_ok {
                    found = Some((i, op));
                    if matches!(scan, Scan::Leftmost) {
                        break;
                    }
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }

    let (pos, op) = found?;
    let left = expr[..pos].trim();
    let right = expr[pos + op.len()..].trim();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, op, right))
}

fn compare(left: &Value, op: &str, right: &Value) -> bool {
    match op {
        "===" => strict_equals(left, right),
        "!==" => !strict_equals(left, right),
        "==" => loose_equals(left, right),
        "!=" => !loose_equals(left, right),
        _ => {
            let ordering = match (as_number(left), as_number(right)) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => Some(display(left).cmp(&display(right))),
            };
            let Some(ordering) = ordering else {
                return false;
            };
            match op {
                ">" => ordering.is_gt(),
                ">=" => ordering.is_ge(),
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                _ => false,
            }
        }
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => is_truthy(left) == is_truthy(right),
        _ => match (as_number(left), as_number(right)) {
            (Some(l), Some(r)) => l == r,
            _ => display(left) == display(right),
        },
    }
}

fn arithmetic(left: &Value, op: &str, right: &Value) -> Value {
    let l = coerce_number(left);
    let r = coerce_number(right);
    let result = match op {
        "+" => l + r,
        "-" => l - r,
        "*" => l * r,
        "/" if r == 0.0 => 0.0,
        "/" => l / r,
        _ => 0.0,
    };
    number_value(result)
}

/// Numeric view of a value, only for numbers and numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Bool(true) => 1.0,
        other => as_number(other).unwrap_or(0.0),
    }
}

/// Integral results are emitted as integers so `2 + 3` is `5`, not `5.0`.
pub(crate) fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return Value::Number((f as i64).into());
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_literals() {
        let empty = Map::new();
        assert_eq!(evaluate("true", &empty), json!(true));
        assert_eq!(evaluate("false", &empty), json!(false));
        assert_eq!(evaluate("42", &empty), json!(42));
        assert_eq!(evaluate("-1.5", &empty), json!(-1.5));
        assert_eq!(evaluate("'hi'", &empty), json!("hi"));
    }

    #[test]
    fn test_unresolved_identifier_is_its_own_text() {
        assert_eq!(evaluate("foo", &Map::new()), json!("foo"));
        assert_eq!(evaluate("  foo.bar  ", &Map::new()), json!("foo.bar"));
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        let context = ctx(json!({"a": 10, "b": 0}));
        assert_eq!(evaluate("a / b", &context), json!(0));
        assert_eq!(evaluate("a / 0", &context), json!(0));
    }

    #[test]
    fn test_arithmetic() {
        let context = ctx(json!({"a": 10, "b": 4, "s": "2.5"}));
        assert_eq!(evaluate("a + b", &context), json!(14));
        assert_eq!(evaluate("a - b - 1", &context), json!(5));
        assert_eq!(evaluate("a * s", &context), json!(25));
        assert_eq!(evaluate("a / b", &context), json!(2.5));
        assert_eq!(evaluate("a + b * 2", &context), json!(18));
    }

    #[test]
    fn test_unspaced_multiplicative_and_plus() {
        let context = ctx(json!({"a": 10, "b": 0, "p": 20, "q": 3}));
        assert_eq!(evaluate("a/b", &context), json!(0));
        assert_eq!(evaluate("p*q", &context), json!(60));
        assert_eq!(evaluate("p+q", &context), json!(23));
        assert_eq!(evaluate("p*-1", &context), json!(-20));
    }

    #[test]
    fn test_hyphenated_path_is_not_subtraction() {
        let context = ctx(json!({"my-node": {"count": 3}}));
        assert_eq!(evaluate("my-node.count", &context), json!(3));
    }

    #[test]
    fn test_comparisons() {
        let context = ctx(json!({"input": 15, "name": "ada", "n": "15"}));
        assert_eq!(evaluate("input > 10", &context), json!(true));
        assert_eq!(evaluate("input <= 10", &context), json!(false));
        assert_eq!(evaluate("input >= 15", &context), json!(true));
        assert_eq!(evaluate("input == n", &context), json!(true));
        assert_eq!(evaluate("input === n", &context), json!(false));
        assert_eq!(evaluate("input !== n", &context), json!(true));
        assert_eq!(evaluate("name == 'ada'", &context), json!(true));
        assert_eq!(evaluate("name != \"bob\"", &context), json!(true));
    }

    #[test]
    fn test_strict_equality_across_number_repr() {
        let context = ctx(json!({"a": 5, "b": 5.0}));
        assert_eq!(evaluate("a === b", &context), json!(true));
    }

    #[test]
    fn test_boolean_operators() {
        let context = ctx(json!({"a": 5, "b": 0, "flag": true}));
        assert_eq!(evaluate("a > 1 && flag", &context), json!(true));
        assert_eq!(evaluate("a > 10 && flag", &context), json!(false));
        assert_eq!(evaluate("b || a > 1", &context), json!(true));
        assert_eq!(evaluate("b || missing", &context), json!(false));
    }

    #[test]
    fn test_operator_inside_quotes_ignored() {
        let context = ctx(json!({"op": "a>b"}));
        assert_eq!(evaluate("op == 'a>b'", &context), json!(true));
    }

    #[test]
    fn test_path_lookup() {
        let context = ctx(json!({"user": {"tags": ["x", "y"]}}));
        assert_eq!(evaluate("user.tags[1]", &context), json!("y"));
        assert_eq!(evaluate("user.tags[1] == 'y'", &context), json!(true));
    }

    #[test]
    fn test_missing_operand_is_null() {
        let context = Map::new();
        assert_eq!(evaluate("missing == null", &context), json!(true));
        assert_eq!(evaluate("missing + 2", &context), json!(2));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("false")));
        assert!(is_truthy(&json!([0])));
        assert!(is_truthy(&json!(-1)));
    }
}
