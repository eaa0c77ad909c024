//! # Condition Evaluation
//!
//! Operands are classified in priority order: numeric, then boolean (`!!true` / `!!false`),
//! then plain text. Both sides must share a class for the typed comparison to apply.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOperator {
    Equals,
    Different,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl EvalOperator {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "==" => Some(Self::Equals),
            "!=" => Some(Self::Different),
            "<" => Some(Self::LessThan),
            ">" => Some(Self::GreaterThan),
            "<=" | "=<" => Some(Self::LessThanOrEqual),
            ">=" => Some(Self::GreaterThanOrEqual),
            _ => None,
        }
    }

    fn apply<T: PartialOrd>(self, a: &T, b: &T) -> bool {
        let Some(ordering) = a.partial_cmp(b) else {
            return self == Self::Different;
        };
        match self {
            Self::Equals => ordering == Ordering::Equal,
            Self::Different => ordering != Ordering::Equal,
            Self::LessThan => ordering == Ordering::Less,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::LessThanOrEqual => ordering != Ordering::Greater,
            Self::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

/// Decimal text parses as a float, anything else as an integer.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.contains('.') {
        text.parse::<f64>().ok()
    } else {
        text.parse::<i64>().ok().map(|n| n as f64)
    }
}

pub fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "!!true" => Some(true),
        "!!false" => Some(false),
        _ => None,
    }
}

/// Compare two variable values. Missing values compare as empty text; an unknown or missing
/// operator is false.
pub fn eval_statement(a: Option<&str>, b: Option<&str>, operator: Option<&str>) -> bool {
    let Some(operator) = operator.and_then(EvalOperator::parse) else {
        return false;
    };
    let a = a.unwrap_or_default();
    let b = b.unwrap_or_default();

    if let (Some(x), Some(y)) = (parse_number(a), parse_number(b)) {
        return operator.apply(&x, &y);
    }
    if let (Some(x), Some(y)) = (parse_boolean(a), parse_boolean(b)) {
        return operator.apply(&x, &y);
    }
    operator.apply(&a.trim(), &b.trim())
}
