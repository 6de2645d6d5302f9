use serde_json::{Number, Value};

/// JMESPath type name of a JSON value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build a JSON number from an `f64`, preferring an integer representation
/// for whole values so `ceil(`1.5`)` compares equal to `2`. Non-finite
/// results have no JSON form and become `null`.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Number of Unicode scalar values, which is what `length` reports.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_numbers_become_integers() {
        assert_eq!(number_value(2.0), json!(2));
        assert_eq!(number_value(-0.5), json!(-0.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn integer_range_edges() {
        let two_pow_63 = 9_223_372_036_854_775_808.0_f64;
        assert_eq!(number_value(two_pow_63), json!(two_pow_63));
        assert_eq!(number_value(-two_pow_63), json!(i64::MIN));
        assert_eq!(number_value(two_pow_63 / 2.0), json!(1_i64 << 62));
    }

    #[test]
    fn type_names() {
        assert_eq!(type_name(&json!({})), "object");
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!(1.5)), "number");
    }

    #[test]
    fn length_counts_code_points() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(char_len("😀"), 1);
    }
}
