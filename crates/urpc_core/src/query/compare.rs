//! JSON value comparison shared by filters and ordering.

use crate::query::filter::MatchMode;
use serde_json::Value;
use std::cmp::Ordering;

/// Structural equality; numbers compare numerically (`1 == 1.0`).
pub fn values_equal(left: &Value, right: &Value, mode: MatchMode) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::String(a), Value::String(b)) => match mode {
            MatchMode::Sensitive => a == b,
            MatchMode::Insensitive => a.to_lowercase() == b.to_lowercase(),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b, mode))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, a)| {
                    b.get(key)
                        .is_some_and(|b| values_equal(a, b, mode))
                })
        }
        _ => left == right,
    }
}

/// Ordering between two scalars of the same JSON type; `None` otherwise.
pub fn compare_scalars(left: &Value, right: &Value, mode: MatchMode) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(match mode {
            MatchMode::Sensitive => a.cmp(b),
            MatchMode::Insensitive => a.to_lowercase().cmp(&b.to_lowercase()),
        }),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order used for sorting: nulls first, then booleans, numbers,
/// strings, arrays and objects; same-type scalars by value.
pub fn compare_for_sort(left: &Value, right: &Value) -> Ordering {
    compare_scalars(left, right, MatchMode::Sensitive)
        .unwrap_or_else(|| type_rank(left).cmp(&type_rank(right)))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::{compare_for_sort, compare_scalars, values_equal};
    use crate::query::filter::MatchMode;
    use serde_json::json;
    use std::cmp::Ordering;

    #[test]
    fn numbers_compare_across_representations() {
        assert!(values_equal(&json!(1), &json!(1.0), MatchMode::Sensitive));
        assert_eq!(
            compare_scalars(&json!(2), &json!(10.5), MatchMode::Sensitive),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn mixed_types_do_not_compare() {
        assert_eq!(compare_scalars(&json!("1"), &json!(1), MatchMode::Sensitive), None);
    }

    #[test]
    fn sort_order_puts_nulls_first() {
        assert_eq!(compare_for_sort(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(compare_for_sort(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
