use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::FunctionError;
use crate::interpreter::Expression;
use crate::value::type_name;

pub mod builtins;
pub mod powertools;
mod signature;

pub use signature::{ArgType, Signature};

/// A function callable from an expression, e.g. `length(@)`.
///
/// Implementations declare a [`Signature`]; arity and argument types are
/// checked by [`invoke`] before `call` runs, so `call` may assume its
/// arguments have the declared shape. Errors returned from `call` carry no
/// function name; the interpreter attaches it.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn signature(&self) -> Signature;
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError>;
}

/// A materialised function argument: a JSON value, or an unevaluated
/// expression reference (`&expr`).
#[derive(Clone)]
pub enum Argument<'a> {
    Value(Value),
    Expression(Expression<'a>),
}

impl<'a> Argument<'a> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Argument::Value(v) => type_name(v),
            Argument::Expression(_) => "expression",
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Argument::Value(v) => Some(v),
            Argument::Expression(_) => None,
        }
    }

    /// The JSON value, or `null` for an expression reference.
    pub fn into_value(self) -> Value {
        match self {
            Argument::Value(v) => v,
            Argument::Expression(_) => Value::Null,
        }
    }

    pub fn as_expression(&self) -> Option<Expression<'a>> {
        match self {
            Argument::Expression(e) => Some(*e),
            Argument::Value(_) => None,
        }
    }
}

impl fmt::Debug for Argument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Argument::Expression(e) => f.debug_tuple("Expression").field(&e.node().kind()).finish(),
        }
    }
}

/// Check arity and argument types against `function`'s signature, then call it.
pub fn invoke(function: &dyn Function, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
    let signature = function.signature();
    signature.check_arity(args.len())?;
    signature.check_types(&args)?;
    function.call(args)
}

/// Thread-safe function registry.
///
/// Clones share the table; `register` copies it on write.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry);
        registry
    }

    /// Builtins plus the `powertools_*` decoding functions.
    pub fn with_powertools() -> Self {
        let mut registry = Self::with_builtins();
        powertools::register_all(&mut registry);
        registry
    }

    /// Add `f`, replacing any function of the same name.
    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("functions", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Double;
    impl Function for Double {
        fn name(&self) -> &'static str {
            "double"
        }
        fn signature(&self) -> Signature {
            Signature::new(vec![vec![ArgType::Number]])
        }
        fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
            let n = args[0].as_value().and_then(Value::as_f64).unwrap_or_default();
            Ok(json!(n * 2.0))
        }
    }

    #[test]
    fn register_copies_on_write() {
        let base = Registry::with_builtins();
        let mut extended = base.clone();
        extended.register(Double);
        assert!(extended.get("double").is_some());
        assert!(base.get("double").is_none());
        assert!(extended.get("length").is_some());
    }

    #[test]
    fn invoke_checks_before_calling() {
        let err = invoke(&Double, vec![]).unwrap_err();
        assert_eq!(err, FunctionError::Arity { expected: 1, actual: 0 });

        let err = invoke(&Double, vec![Argument::Value(json!("x"))]).unwrap_err();
        assert!(matches!(err, FunctionError::InvalidType { ref actual_type, .. } if actual_type == "string"));

        assert_eq!(invoke(&Double, vec![Argument::Value(json!(2))]).unwrap(), json!(4.0));
    }

    #[test]
    fn powertools_extend_builtins() {
        let names = Registry::with_powertools().names();
        assert!(names.contains(&"powertools_json"));
        assert!(names.contains(&"sort_by"));
        assert!(!Registry::with_builtins().names().contains(&"powertools_json"));
    }
}
