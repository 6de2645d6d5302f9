use std::fmt;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::trace;

use crate::ast::{Comparator, Node};
use crate::comparison::{cmp_values, is_truthy, strict_equal};
use crate::context::SearchOptions;
use crate::errors::{JmesPathError, Result};
use crate::functions::{self, Argument, Registry};

static BUILTINS: Lazy<Registry> = Lazy::new(Registry::with_builtins);

/// Evaluates an AST against a JSON value.
///
/// Holds only its function table, so one interpreter can serve any number
/// of concurrent evaluations.
#[derive(Debug, Clone)]
pub struct TreeInterpreter {
    functions: Registry,
}

impl TreeInterpreter {
    /// Uses the custom function table from `options`, or the builtins.
    pub fn new(options: &SearchOptions) -> Self {
        let functions = options
            .custom_functions
            .clone()
            .unwrap_or_else(|| BUILTINS.clone());
        Self::with_registry(functions)
    }

    pub fn with_registry(functions: Registry) -> Self {
        Self { functions }
    }

    pub fn visit(&self, node: &Node, value: &Value) -> Result<Value> {
        match node {
            Node::Identity | Node::Current => Ok(value.clone()),
            Node::Field(name) => Ok(match value {
                Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            }),
            Node::Literal(literal) => Ok(literal.clone()),
            Node::Subexpression(children) | Node::IndexExpression(children) => {
                let mut current = value.clone();
                for child in children {
                    current = self.visit(child, &current)?;
                }
                Ok(current)
            }
            Node::Index(index) => Ok(match value {
                Value::Array(items) => resolve_index(items.len(), *index)
                    .map(|i| items[i].clone())
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            }),
            Node::Slice { start, stop, step } => match value {
                Value::Array(items) => slice(items, *start, *stop, *step).map(Value::Array),
                _ => Ok(Value::Null),
            },
            Node::Pipe(left, right) => {
                let left = self.visit(left, value)?;
                self.visit(right, &left)
            }
            Node::Comparator { op, left, right } => {
                let left = self.visit(left, value)?;
                let right = self.visit(right, value)?;
                Ok(compare(*op, &left, &right))
            }
            Node::OrExpression(left, right) => {
                let left = self.visit(left, value)?;
                if is_truthy(&left) {
                    Ok(left)
                } else {
                    self.visit(right, value)
                }
            }
            Node::AndExpression(left, right) => {
                let left = self.visit(left, value)?;
                if is_truthy(&left) {
                    self.visit(right, value)
                } else {
                    Ok(left)
                }
            }
            Node::NotExpression(child) => {
                let child = self.visit(child, value)?;
                // `!0` is false even though 0 is truthy.
                let is_zero = child.as_f64() == Some(0.0);
                Ok(Value::Bool(!is_zero && !is_truthy(&child)))
            }
            Node::Flatten(child) => Ok(match self.visit(child, value)? {
                Value::Array(items) => {
                    let mut flat = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::Array(inner) => flat.extend(inner),
                            other => flat.push(other),
                        }
                    }
                    Value::Array(flat)
                }
                _ => Value::Null,
            }),
            Node::Projection { left, right } => match self.visit(left, value)? {
                Value::Array(items) => self.project(items.iter(), right),
                _ => Ok(Value::Null),
            },
            Node::ValueProjection { left, right } => match self.visit(left, value)? {
                Value::Object(map) => self.project(map.values(), right),
                _ => Ok(Value::Null),
            },
            Node::FilterProjection {
                left,
                right,
                condition,
            } => {
                let Value::Array(items) = self.visit(left, value)? else {
                    return Ok(Value::Null);
                };
                let mut kept = Vec::new();
                for item in items {
                    if is_truthy(&self.visit(condition, &item)?) {
                        kept.push(item);
                    }
                }
                self.project(kept.iter(), right)
            }
            Node::MultiSelectList(children) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let items = children
                    .iter()
                    .map(|child| self.visit(child, value))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(items))
            }
            Node::MultiSelectDict(pairs) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut object = Map::new();
                for pair in pairs {
                    object.insert(pair.key.clone(), self.visit(&pair.value, value)?);
                }
                Ok(Value::Object(object))
            }
            Node::FunctionExpression { name, args } => self.call_function(name, args, value),
            // A bare `&expr` has no JSON representation.
            Node::Expref(_) => Ok(Value::Null),
        }
    }

    /// Apply `right` to each element, dropping `null` results.
    fn project<'v>(&self, items: impl Iterator<Item = &'v Value>, right: &Node) -> Result<Value> {
        let mut collected = Vec::new();
        for item in items {
            let projected = self.visit(right, item)?;
            if !projected.is_null() {
                collected.push(projected);
            }
        }
        Ok(Value::Array(collected))
    }

    fn call_function(&self, name: &str, args: &[Node], value: &Value) -> Result<Value> {
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(match arg {
                Node::Expref(child) => Argument::Expression(Expression::new(child, self)),
                other => Argument::Value(self.visit(other, value)?),
            });
        }
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| JmesPathError::UnknownFunction {
                name: name.to_string(),
                expression: None,
            })?;
        trace!(function = name, args = resolved.len(), "dispatching function");
        functions::invoke(function.as_ref(), resolved).map_err(|e| e.named(name))
    }
}

/// An unevaluated expression reference (`&expr`) passed to a function,
/// bound to the interpreter that will evaluate it.
#[derive(Clone, Copy)]
pub struct Expression<'a> {
    node: &'a Node,
    interpreter: &'a TreeInterpreter,
}

impl<'a> Expression<'a> {
    pub fn new(node: &'a Node, interpreter: &'a TreeInterpreter) -> Self {
        Self { node, interpreter }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn visit(&self, value: &Value) -> Result<Value> {
        self.interpreter.visit(self.node, value)
    }
}

impl fmt::Debug for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression").field("node", self.node).finish()
    }
}

fn compare(op: Comparator, left: &Value, right: &Value) -> Value {
    let result = match op {
        Comparator::Eq => Some(strict_equal(left, right)),
        Comparator::Ne => Some(!strict_equal(left, right)),
        Comparator::Lt => cmp_values(left, right, |o| o.is_lt()),
        Comparator::Lte => cmp_values(left, right, |o| o.is_le()),
        Comparator::Gt => cmp_values(left, right, |o| o.is_gt()),
        Comparator::Gte => cmp_values(left, right, |o| o.is_ge()),
    };
    result.map(Value::Bool).unwrap_or(Value::Null)
}

/// Negative indices count from the end.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Python-style slicing with bounds clamped to the array.
fn slice(items: &[Value], start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Result<Vec<Value>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(JmesPathError::InvalidSlice { expression: None });
    }
    let len = items.len() as i64;
    let start = match start {
        Some(start) => cap_slice_bound(len, start, step),
        None if step < 0 => len - 1,
        None => 0,
    };
    let stop = match stop {
        Some(stop) => cap_slice_bound(len, stop, step),
        None if step < 0 => -1,
        None => len,
    };

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(items[i as usize].clone());
        i += step;
    }
    Ok(out)
}

fn cap_slice_bound(len: i64, bound: i64, step: i64) -> i64 {
    if bound < 0 {
        let bound = bound + len;
        if bound < 0 {
            if step < 0 { -1 } else { 0 }
        } else {
            bound
        }
    } else if bound >= len {
        if step < 0 { len - 1 } else { len }
    } else {
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval(expression: &str, data: Value) -> Result<Value> {
        Parser::new().parse(expression)?.search(&data, &SearchOptions::default())
    }

    #[test]
    fn slices() {
        let data = json!([0, 1, 2, 3, 4, 5]);
        assert_eq!(eval("[1:3]", data.clone()).unwrap(), json!([1, 2]));
        assert_eq!(eval("[::2]", data.clone()).unwrap(), json!([0, 2, 4]));
        assert_eq!(eval("[::-1]", data.clone()).unwrap(), json!([5, 4, 3, 2, 1, 0]));
        assert_eq!(eval("[-2:]", data.clone()).unwrap(), json!([4, 5]));
        assert_eq!(eval("[10:]", data.clone()).unwrap(), json!([]));
        assert_eq!(eval("[-10:2]", data.clone()).unwrap(), json!([0, 1]));
        assert_eq!(eval("[4:1:-2]", data.clone()).unwrap(), json!([4, 2]));
        assert_eq!(eval("[1:2]", json!({"a": 1})).unwrap(), Value::Null);
    }

    #[test]
    fn zero_step_is_an_error() {
        let err = eval("[::0]", json!([1])).unwrap_err();
        assert_eq!(
            err,
            JmesPathError::InvalidSlice {
                expression: Some("[::0]".into())
            }
        );
    }

    #[test]
    fn negation_of_zero() {
        assert_eq!(eval("!`0`", json!(null)).unwrap(), json!(false));
        assert_eq!(eval("!`\"\"`", json!(null)).unwrap(), json!(true));
        assert_eq!(eval("!a", json!({"a": [1]})).unwrap(), json!(false));
    }

    #[test]
    fn bare_expref_is_null() {
        assert_eq!(eval("&a", json!({"a": 1})).unwrap(), Value::Null);
    }

    #[test]
    fn function_errors_are_named() {
        let err = eval("abs(`\"x\"`)", json!(null)).unwrap_err();
        assert!(matches!(err, JmesPathError::InvalidType { ref function, .. } if function == "abs"));
    }

    #[test]
    fn expref_errors_surface_unchanged() {
        let err = eval("map(&[::0], @)", json!([[1]])).unwrap_err();
        assert!(matches!(err, JmesPathError::InvalidSlice { .. }));
    }

    #[test]
    fn index_resolution() {
        assert_eq!(resolve_index(3, -1), Some(2));
        assert_eq!(resolve_index(3, -4), None);
        assert_eq!(resolve_index(0, 0), None);
        assert_eq!(resolve_index(3, 3), None);
    }
}
