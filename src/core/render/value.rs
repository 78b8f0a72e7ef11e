use std::cmp::Ordering;
use std::fmt;

use crate::core::validation::tokenizer::Comparison;
use crate::types::{FieldValue, Lookup};

/// A value produced while evaluating a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Selected checkbox labels
    List(Vec<String>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Text(text) => !text.is_empty() && text != "0",
            Value::Number(n) => *n != 0.0,
            Value::Boolean(b) => *b,
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(text) => text.trim().parse().ok(),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::List(_) => None,
        }
    }

    /// Numeric comparison when both sides read as numbers, string comparison otherwise.
    pub fn compare(&self, op: Comparison, other: &Value) -> bool {
        let ordering = match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(self.to_string().cmp(&other.to_string())),
        };
        match (op, ordering) {
            (Comparison::Eq, Some(o)) => o == Ordering::Equal,
            (Comparison::Ne, Some(o)) => o != Ordering::Equal,
            (Comparison::Gt, Some(o)) => o == Ordering::Greater,
            (Comparison::Lt, Some(o)) => o == Ordering::Less,
            (Comparison::Ge, Some(o)) => o != Ordering::Less,
            (Comparison::Le, Some(o)) => o != Ordering::Greater,
            (Comparison::Ne, None) => true,
            (_, None) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{}", text),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(true) => write!(f, "1"),
            Value::Boolean(false) => Ok(()),
            Value::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<Lookup<'_>> for Value {
    fn from(lookup: Lookup<'_>) -> Self {
        match lookup {
            Lookup::Value(FieldValue::Text(text)) => Value::Text(text.clone()),
            Lookup::Value(FieldValue::Checkbox { labels, .. }) => Value::List(labels.clone()),
            Lookup::AllValues(all_values) => Value::Text(all_values.to_string()),
        }
    }
}
