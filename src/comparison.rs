use std::cmp::Ordering;

use serde_json::Value;

/// Ordering comparison, defined only between two numbers. Any other pairing
/// (string against string included) has no ordering and yields `None`.
pub fn cmp_values<F>(a: &Value, b: &Value, pred_on_ord: F) -> Option<bool>
where
    F: Fn(Ordering) -> bool,
{
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            let ord = na.as_f64()?.partial_cmp(&nb.as_f64()?)?;
            Some(pred_on_ord(ord))
        }
        _ => None,
    }
}

/// Deep structural equality over JSON values. Numbers compare by value
/// (`1` equals `1.0`); object key order does not matter.
pub fn strict_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| strict_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| strict_equal(v, other)))
        }
        _ => false,
    }
}

/// JMESPath truthiness: `null`, `false`, `""`, `[]` and `{}` are false.
/// Every number, zero included, is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ordering_needs_two_numbers() {
        assert_eq!(cmp_values(&json!(1), &json!(2), |o| o.is_lt()), Some(true));
        assert_eq!(cmp_values(&json!(2.5), &json!(2), |o| o.is_ge()), Some(true));
        assert_eq!(cmp_values(&json!("a"), &json!("b"), |o| o.is_lt()), None);
        assert_eq!(cmp_values(&json!(1), &json!("1"), |o| o.is_eq()), None);
    }

    #[test]
    fn deep_equality() {
        assert!(strict_equal(&json!({"a": [1, {"b": 2}]}), &json!({"a": [1.0, {"b": 2}]})));
        assert!(strict_equal(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!strict_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!strict_equal(&json!(1), &json!("1")));
        assert!(!strict_equal(&json!(null), &json!(false)));
    }

    #[test]
    fn zero_is_truthy() {
        assert!(is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!([0])));
    }
}
