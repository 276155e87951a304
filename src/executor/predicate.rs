use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{error::DatabaseError, record::Record, value::Value};

/// Comparison operators for criteria leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    IsNull,
    IsNotNull,
}

/// A predicate tree over schemaless records. A field absent from a record
/// evaluates as Null. AND binds above OR in the parsed form, which the
/// n-ary nodes preserve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criteria {
    /// key op value
    Compare {
        key: String,
        op: ComparisonOp,
        value: Value,
    },
    /// key IN (values) / key NOT IN (values)
    InList {
        key: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// low <= key <= high
    Between {
        key: String,
        low: Value,
        high: Value,
    },
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
}

impl Criteria {
    pub fn eq(key: impl Into<String>, value: Value) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::Equal,
            value,
        }
    }

    pub fn ne(key: impl Into<String>, value: Value) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::NotEqual,
            value,
        }
    }

    pub fn lt(key: impl Into<String>, value: Value) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::LessThan,
            value,
        }
    }

    pub fn le(key: impl Into<String>, value: Value) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::LessThanOrEqual,
            value,
        }
    }

    pub fn gt(key: impl Into<String>, value: Value) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::GreaterThan,
            value,
        }
    }

    pub fn ge(key: impl Into<String>, value: Value) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::GreaterThanOrEqual,
            value,
        }
    }

    pub fn like(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::Like,
            value: Value::Text(pattern.into()),
        }
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::IsNull,
            value: Value::Null,
        }
    }

    pub fn is_not_null(key: impl Into<String>) -> Self {
        Self::Compare {
            key: key.into(),
            op: ComparisonOp::IsNotNull,
            value: Value::Null,
        }
    }

    pub fn in_list(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self::InList {
            key: key.into(),
            values,
            negated: false,
        }
    }

    pub fn not_in_list(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self::InList {
            key: key.into(),
            values,
            negated: true,
        }
    }

    pub fn between(key: impl Into<String>, low: Value, high: Value) -> Self {
        Self::Between {
            key: key.into(),
            low,
            high,
        }
    }

    pub fn and(criteria: Vec<Criteria>) -> Self {
        Self::And(criteria)
    }

    pub fn or(criteria: Vec<Criteria>) -> Self {
        Self::Or(criteria)
    }

    /// Evaluate against a record. Short-circuits through AND/OR nodes.
    pub fn evaluate(&self, record: &Record) -> Result<bool, DatabaseError> {
        match self {
            Criteria::Compare { key, op, value } => {
                let field = record.get(key).unwrap_or(&Value::Null);
                compare_values(field, *op, value)
            }
            Criteria::InList {
                key,
                values,
                negated,
            } => {
                let field = record.get(key).unwrap_or(&Value::Null);
                let found = values.iter().any(|candidate| field == candidate);
                Ok(if *negated { !found } else { found })
            }
            Criteria::Between { key, low, high } => {
                let field = record.get(key).unwrap_or(&Value::Null);
                Ok(cmp_is(field, low, |o| o != Ordering::Less)
                    && cmp_is(field, high, |o| o != Ordering::Greater))
            }
            Criteria::And(criteria) => {
                for criterion in criteria {
                    if !criterion.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Criteria::Or(criteria) => {
                for criterion in criteria {
                    if criterion.evaluate(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// The single (key, value) pair of a plain equality leaf, the shape an
    /// index can answer directly.
    pub fn as_equality(&self) -> Option<(&str, &Value)> {
        match self {
            Criteria::Compare {
                key,
                op: ComparisonOp::Equal,
                value,
            } => Some((key.as_str(), value)),
            _ => None,
        }
    }
}

fn compare_values(left: &Value, op: ComparisonOp, right: &Value) -> Result<bool, DatabaseError> {
    match op {
        ComparisonOp::Equal => Ok(left == right),
        ComparisonOp::NotEqual => Ok(left != right),
        ComparisonOp::LessThan => Ok(cmp_is(left, right, |o| o == Ordering::Less)),
        ComparisonOp::LessThanOrEqual => Ok(cmp_is(left, right, |o| o != Ordering::Greater)),
        ComparisonOp::GreaterThan => Ok(cmp_is(left, right, |o| o == Ordering::Greater)),
        ComparisonOp::GreaterThanOrEqual => Ok(cmp_is(left, right, |o| o != Ordering::Less)),
        ComparisonOp::IsNull => Ok(left.is_null()),
        ComparisonOp::IsNotNull => Ok(!left.is_null()),
        ComparisonOp::Like => match (left, right) {
            (Value::Text(text), Value::Text(pattern)) => Ok(like_match(text, pattern)),
            _ => Ok(false),
        },
    }
}

fn cmp_is(left: &Value, right: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    // NULL and incomparable operands fail every range comparison.
    if left.is_null() || right.is_null() {
        return false;
    }
    left.partial_cmp(right).is_some_and(accept)
}

/// SQL LIKE over chars: `%` matches any run, `_` matches one char.
/// Greedy with backtracking on the last `%`.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let mut t = 0;
    let mut p = 0;
    let mut star: Option<usize> = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(star_p) = star {
            p = star_p + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '%' {
        p += 1;
    }
    p == pattern.len()
}
