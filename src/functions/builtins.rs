//! The standard JMESPath function library.

use std::cmp::Ordering;

use itertools::Itertools;
use serde_json::{Map, Value};

use super::*;
use crate::comparison::strict_equal;
use crate::value::{char_len, number_value};

pub(crate) fn register_all(registry: &mut Registry) {
    registry.register(Abs);
    registry.register(Avg);
    registry.register(Ceil);
    registry.register(Contains);
    registry.register(EndsWith);
    registry.register(Floor);
    registry.register(Join);
    registry.register(Keys);
    registry.register(Length);
    registry.register(MapFn);
    registry.register(Max);
    registry.register(MaxBy);
    registry.register(Merge);
    registry.register(Min);
    registry.register(MinBy);
    registry.register(NotNull);
    registry.register(Reverse);
    registry.register(Sort);
    registry.register(SortBy);
    registry.register(StartsWith);
    registry.register(Sum);
    registry.register(ToArray);
    registry.register(ToNumber);
    registry.register(ToStringFn);
    registry.register(Type);
    registry.register(Values);
}

pub struct Abs;
impl Function for Abs {
    fn name(&self) -> &'static str { "abs" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Number]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let value = value_arg(&args, 0)?;
        if let Some(abs) = value.as_i64().and_then(i64::checked_abs) {
            return Ok(Value::from(abs));
        }
        Ok(number_value(number_arg(&args, 0)?.abs()))
    }
}

pub struct Avg;
impl Function for Avg {
    fn name(&self) -> &'static str { "avg" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::ARRAY_NUMBER]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let items = array_arg(&args, 0)?;
        if items.is_empty() {
            return Ok(Value::Null);
        }
        let total: f64 = items.iter().filter_map(Value::as_f64).sum();
        Ok(number_value(total / items.len() as f64))
    }
}

pub struct Ceil;
impl Function for Ceil {
    fn name(&self) -> &'static str { "ceil" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Number]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(number_value(number_arg(&args, 0)?.ceil()))
    }
}

/// Substring test for strings, deep-equality membership for arrays.
pub struct Contains;
impl Function for Contains {
    fn name(&self) -> &'static str { "contains" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::Array, ArgType::String], vec![ArgType::Any]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let needle = value_arg(&args, 1)?;
        let found = match value_arg(&args, 0)? {
            Value::Array(items) => items.iter().any(|item| strict_equal(item, needle)),
            Value::String(haystack) => needle.as_str().is_some_and(|n| haystack.contains(n)),
            other => return Err(type_error(&["array", "string"], other)),
        };
        Ok(Value::Bool(found))
    }
}

pub struct EndsWith;
impl Function for EndsWith {
    fn name(&self) -> &'static str { "ends_with" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::String], vec![ArgType::String]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(Value::Bool(string_arg(&args, 0)?.ends_with(string_arg(&args, 1)?)))
    }
}

pub struct Floor;
impl Function for Floor {
    fn name(&self) -> &'static str { "floor" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Number]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(number_value(number_arg(&args, 0)?.floor()))
    }
}

pub struct Join;
impl Function for Join {
    fn name(&self) -> &'static str { "join" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::String], vec![ArgType::ARRAY_STRING]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let glue = string_arg(&args, 0)?;
        let joined = array_arg(&args, 1)?.iter().filter_map(Value::as_str).join(glue);
        Ok(Value::String(joined))
    }
}

pub struct Keys;
impl Function for Keys {
    fn name(&self) -> &'static str { "keys" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Object]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let keys = object_arg(&args, 0)?.keys().cloned().map(Value::String).collect();
        Ok(Value::Array(keys))
    }
}

/// Element count, code point count for strings, key count for objects.
pub struct Length;
impl Function for Length {
    fn name(&self) -> &'static str { "length" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::Array, ArgType::String, ArgType::Object]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let len = match value_arg(&args, 0)? {
            Value::Array(items) => items.len(),
            Value::String(s) => char_len(s),
            Value::Object(map) => map.len(),
            other => return Err(type_error(&["array", "string", "object"], other)),
        };
        Ok(Value::from(len))
    }
}

/// `map(&expr, array)`. Elements the expression resolves to `null` stay
/// in the output as `null`.
pub struct MapFn;
impl Function for MapFn {
    fn name(&self) -> &'static str { "map" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::Expression], vec![ArgType::Array]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let expression = expression_arg(&args, 0)?;
        let mapped = array_arg(&args, 1)?
            .iter()
            .map(|item| expression.visit(item))
            .collect::<crate::errors::Result<Vec<_>>>()?;
        Ok(Value::Array(mapped))
    }
}

pub struct Max;
impl Function for Max {
    fn name(&self) -> &'static str { "max" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::ARRAY_NUMBER, ArgType::ARRAY_STRING]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let items = array_arg(&args, 0)?;
        Ok(extremum(items.iter(), Ordering::Greater).cloned().unwrap_or(Value::Null))
    }
}

pub struct MaxBy;
impl Function for MaxBy {
    fn name(&self) -> &'static str { "max_by" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::Array], vec![ArgType::Expression]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        extremum_by(&args, Ordering::Greater)
    }
}

/// Shallow merge, later objects win.
pub struct Merge;
impl Function for Merge {
    fn name(&self) -> &'static str { "merge" }
    fn signature(&self) -> Signature { Signature::variadic(vec![vec![ArgType::Object]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let mut merged = Map::new();
        for arg in args {
            match arg.into_value() {
                Value::Object(map) => merged.extend(map),
                other => return Err(type_error(&["object"], &other)),
            }
        }
        Ok(Value::Object(merged))
    }
}

pub struct Min;
impl Function for Min {
    fn name(&self) -> &'static str { "min" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::ARRAY_NUMBER, ArgType::ARRAY_STRING]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let items = array_arg(&args, 0)?;
        Ok(extremum(items.iter(), Ordering::Less).cloned().unwrap_or(Value::Null))
    }
}

pub struct MinBy;
impl Function for MinBy {
    fn name(&self) -> &'static str { "min_by" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::Array], vec![ArgType::Expression]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        extremum_by(&args, Ordering::Less)
    }
}

pub struct NotNull;
impl Function for NotNull {
    fn name(&self) -> &'static str { "not_null" }
    fn signature(&self) -> Signature { Signature::variadic(vec![vec![]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(args
            .into_iter()
            .map(Argument::into_value)
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null))
    }
}

pub struct Reverse;
impl Function for Reverse {
    fn name(&self) -> &'static str { "reverse" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::String, ArgType::Array]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        match value_arg(&args, 0)? {
            Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            other => Err(type_error(&["string", "array"], other)),
        }
    }
}

pub struct Sort;
impl Function for Sort {
    fn name(&self) -> &'static str { "sort" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::ARRAY_NUMBER, ArgType::ARRAY_STRING]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let mut items = array_arg(&args, 0)?.to_vec();
        items.sort_by(compare_keys);
        Ok(Value::Array(items))
    }
}

/// Stable sort by the string or number each element maps to.
pub struct SortBy;
impl Function for SortBy {
    fn name(&self) -> &'static str { "sort_by" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::Array], vec![ArgType::Expression]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let mut keyed = keyed_elements(&args)?;
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        Ok(Value::Array(keyed.into_iter().map(|(_, item)| item.clone()).collect()))
    }
}

pub struct StartsWith;
impl Function for StartsWith {
    fn name(&self) -> &'static str { "starts_with" }
    fn signature(&self) -> Signature {
        Signature::new(vec![vec![ArgType::String], vec![ArgType::String]])
    }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(Value::Bool(string_arg(&args, 0)?.starts_with(string_arg(&args, 1)?)))
    }
}

pub struct Sum;
impl Function for Sum {
    fn name(&self) -> &'static str { "sum" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::ARRAY_NUMBER]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let total: f64 = array_arg(&args, 0)?.iter().filter_map(Value::as_f64).sum();
        Ok(number_value(total))
    }
}

pub struct ToArray;
impl Function for ToArray {
    fn name(&self) -> &'static str { "to_array" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Any]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(match value_arg(&args, 0)? {
            Value::Array(items) => Value::Array(items.clone()),
            other => Value::Array(vec![other.clone()]),
        })
    }
}

/// Numbers pass through, numeric strings are parsed, everything else is `null`.
pub struct ToNumber;
impl Function for ToNumber {
    fn name(&self) -> &'static str { "to_number" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Any]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(match value_arg(&args, 0)? {
            Value::Number(n) => Value::Number(n.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(number_value)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }
}

pub struct ToStringFn;
impl Function for ToStringFn {
    fn name(&self) -> &'static str { "to_string" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Any]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        match value_arg(&args, 0)? {
            Value::String(s) => Ok(Value::String(s.clone())),
            other => serde_json::to_string(other)
                .map(Value::String)
                .map_err(|e| FunctionError::Custom(e.to_string())),
        }
    }
}

pub struct Type;
impl Function for Type {
    fn name(&self) -> &'static str { "type" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Any]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(Value::from(type_name(value_arg(&args, 0)?)))
    }
}

pub struct Values;
impl Function for Values {
    fn name(&self) -> &'static str { "values" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::Object]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        Ok(Value::Array(object_arg(&args, 0)?.values().cloned().collect()))
    }
}

/// Orders two numbers or two strings; other pairings compare equal.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// First element strictly beyond every earlier one in direction `wanted`.
fn extremum<'v>(items: impl Iterator<Item = &'v Value>, wanted: Ordering) -> Option<&'v Value> {
    items.fold(None, |best, item| match best {
        Some(best) if compare_keys(item, best) != wanted => Some(best),
        _ => Some(item),
    })
}

fn extremum_by(args: &[Argument<'_>], wanted: Ordering) -> Result<Value, FunctionError> {
    let keyed = keyed_elements(args)?;
    let best = keyed.iter().fold(None, |best: Option<&(Value, &Value)>, entry| match best {
        Some(best) if compare_keys(&entry.0, &best.0) != wanted => Some(best),
        _ => Some(entry),
    });
    Ok(best.map(|(_, item)| (*item).clone()).unwrap_or(Value::Null))
}

/// Pair each element of the array argument with its key from the expression
/// argument. Keys must all be numbers or all be strings.
fn keyed_elements<'v>(args: &'v [Argument<'_>]) -> Result<Vec<(Value, &'v Value)>, FunctionError> {
    let items = array_arg(args, 0)?;
    let expression = expression_arg(args, 1)?;
    let mut keyed = Vec::with_capacity(items.len());
    let mut key_type: Option<&'static str> = None;
    for item in items {
        let key = expression.visit(item)?;
        let actual = type_name(&key);
        let expected = *key_type.get_or_insert(actual);
        if !matches!(actual, "number" | "string") || actual != expected {
            let expected = if matches!(expected, "number" | "string") { expected } else { "string" };
            return Err(type_error(&[expected], &key));
        }
        keyed.push((key, item));
    }
    Ok(keyed)
}

fn type_error(expected: &[&str], actual: &Value) -> FunctionError {
    FunctionError::InvalidType {
        current_value: actual.clone(),
        expected_types: expected.iter().map(|t| t.to_string()).collect(),
        actual_type: type_name(actual).to_string(),
    }
}

fn arg<'b, 'a>(args: &'b [Argument<'a>], index: usize) -> Result<&'b Argument<'a>, FunctionError> {
    args.get(index).ok_or(FunctionError::Arity {
        expected: index + 1,
        actual: args.len(),
    })
}

fn value_arg<'b>(args: &'b [Argument<'_>], index: usize) -> Result<&'b Value, FunctionError> {
    let argument = arg(args, index)?;
    argument.as_value().ok_or_else(|| FunctionError::InvalidType {
        current_value: Value::Null,
        expected_types: vec!["any".into()],
        actual_type: argument.type_name().into(),
    })
}

fn number_arg(args: &[Argument<'_>], index: usize) -> Result<f64, FunctionError> {
    let value = value_arg(args, index)?;
    value.as_f64().ok_or_else(|| type_error(&["number"], value))
}

fn string_arg<'b>(args: &'b [Argument<'_>], index: usize) -> Result<&'b str, FunctionError> {
    let value = value_arg(args, index)?;
    value.as_str().ok_or_else(|| type_error(&["string"], value))
}

fn array_arg<'b>(args: &'b [Argument<'_>], index: usize) -> Result<&'b [Value], FunctionError> {
    let value = value_arg(args, index)?;
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| type_error(&["array"], value))
}

fn object_arg<'b>(args: &'b [Argument<'_>], index: usize) -> Result<&'b Map<String, Value>, FunctionError> {
    let value = value_arg(args, index)?;
    value.as_object().ok_or_else(|| type_error(&["object"], value))
}

fn expression_arg<'a>(args: &[Argument<'a>], index: usize) -> Result<Expression<'a>, FunctionError> {
    let argument = arg(args, index)?;
    argument.as_expression().ok_or_else(|| FunctionError::InvalidType {
        current_value: argument.clone().into_value(),
        expected_types: vec!["expression".into()],
        actual_type: argument.type_name().into(),
    })
}
