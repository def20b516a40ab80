//! The evaluator's value model.
//!
//! Every expression evaluates to an ordered sequence of [`Value`]s. Element
//! values stay remote references; coercing one to a string or number does
//! not contact the host (strings are empty, numbers NaN).

use uiaquery_script::{ElementRef, format_number};
use uiaquery_xpath::ast::ComparisonOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Element(ElementRef),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn as_element(&self) -> Option<&ElementRef> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn to_xpath_string(&self) -> String {
        match self {
            Self::Element(_) => String::new(),
            Self::String(text) => text.clone(),
            Self::Number(number) => format_number(*number),
            Self::Boolean(flag) => flag.to_string(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Element(_) => f64::NAN,
            Self::String(text) => parse_number(text),
            Self::Number(number) => *number,
            Self::Boolean(flag) => f64::from(u8::from(*flag)),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Element(_) => true,
            Self::String(text) => !text.is_empty(),
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::Boolean(flag) => *flag,
        }
    }
}

pub(crate) fn string_value(values: &[Value]) -> String {
    values.first().map(Value::to_xpath_string).unwrap_or_default()
}

pub(crate) fn number_value(values: &[Value]) -> f64 {
    values.first().map_or(f64::NAN, Value::to_number)
}

pub(crate) fn boolean_value(values: &[Value]) -> bool {
    values.first().is_some_and(Value::to_boolean)
}

pub(crate) fn elements(values: Vec<Value>) -> Vec<ElementRef> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Element(element) => Some(element),
            _ => None,
        })
        .collect()
}

fn is_xpath_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// XPath 1.0 `number()` of a string: optional whitespace, an optional minus
/// sign, digits with an optional fraction. Anything else is NaN.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_xpath_space);
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    let valid = digits(whole)
        && fraction.is_none_or(digits)
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));
    if valid { trimmed.parse().unwrap_or(f64::NAN) } else { f64::NAN }
}

pub(crate) fn split_xpath_whitespace(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_xpath_space).filter(|part| !part.is_empty())
}

/// A single non-element value compares as that scalar; anything else
/// compares existentially over its items.
fn scalar(values: &[Value]) -> Option<&Value> {
    match values {
        [value] if !matches!(value, Value::Element(_)) => Some(value),
        _ => None,
    }
}

/// XPath 1.0 comparison of two sequences.
pub(crate) fn compare(left: &[Value], op: ComparisonOp, right: &[Value]) -> bool {
    match (scalar(left), scalar(right)) {
        (Some(l), Some(r)) => compare_scalars(l, op, r),
        (None, Some(r)) => compare_set_with_scalar(left, op, r),
        (Some(l), None) => compare_set_with_scalar(right, op.flipped(), l),
        (None, None) => left.iter().any(|l| {
            right.iter().any(|r| match op {
                ComparisonOp::Eq | ComparisonOp::Ne => {
                    compare_strings(&l.to_xpath_string(), op, &r.to_xpath_string())
                }
                _ => compare_numbers(l.to_number(), op, r.to_number()),
            })
        }),
    }
}

fn compare_set_with_scalar(set: &[Value], op: ComparisonOp, scalar: &Value) -> bool {
    match scalar {
        Value::Boolean(flag) => compare_scalars(&Value::Boolean(boolean_value(set)), op, &Value::Boolean(*flag)),
        Value::Number(number) => set.iter().any(|item| compare_numbers(item.to_number(), op, *number)),
        _ => set.iter().any(|item| compare_scalars(&Value::String(item.to_xpath_string()), op, scalar)),
    }
}

fn compare_scalars(left: &Value, op: ComparisonOp, right: &Value) -> bool {
    match op {
        ComparisonOp::Eq | ComparisonOp::Ne => match (left, right) {
            (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                let equal = left.to_boolean() == right.to_boolean();
                if op == ComparisonOp::Eq { equal } else { !equal }
            }
            (Value::Number(_), _) | (_, Value::Number(_)) => compare_numbers(left.to_number(), op, right.to_number()),
            _ => compare_strings(&left.to_xpath_string(), op, &right.to_xpath_string()),
        },
        _ => compare_numbers(left.to_number(), op, right.to_number()),
    }
}

fn compare_strings(left: &str, op: ComparisonOp, right: &str) -> bool {
    if op == ComparisonOp::Eq { left == right } else { left != right }
}

#[allow(clippy::float_cmp)]
fn compare_numbers(left: f64, op: ComparisonOp, right: f64) -> bool {
    match op {
        ComparisonOp::Eq => left == right,
        // NaN != NaN is true in IEEE arithmetic and in XPath
        ComparisonOp::Ne => left != right,
        ComparisonOp::Lt => left < right,
        ComparisonOp::Le => left <= right,
        ComparisonOp::Gt => left > right,
        ComparisonOp::Ge => left >= right,
    }
}
