use std::fmt;

use serde_json::Value;

use crate::errors::FunctionError;
use crate::functions::Argument;
use crate::value::type_name;

/// A type accepted at one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Expression,
    /// An array whose every element matches the inner type.
    ArrayOf(&'static ArgType),
}

impl ArgType {
    pub const ARRAY_NUMBER: ArgType = ArgType::ArrayOf(&ArgType::Number);
    pub const ARRAY_STRING: ArgType = ArgType::ArrayOf(&ArgType::String);
    pub const ARRAY_OBJECT: ArgType = ArgType::ArrayOf(&ArgType::Object);

    pub fn matches(&self, arg: &Argument<'_>) -> bool {
        match (self, arg) {
            (ArgType::Any, _) => true,
            (ArgType::Expression, Argument::Expression(_)) => true,
            (_, Argument::Expression(_)) => false,
            (t, Argument::Value(v)) => t.matches_value(v),
        }
    }

    fn matches_value(&self, value: &Value) -> bool {
        match self {
            ArgType::Any => true,
            ArgType::Null => value.is_null(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::Number => value.is_number(),
            ArgType::String => value.is_string(),
            ArgType::Array => value.is_array(),
            ArgType::Object => value.is_object(),
            ArgType::Expression => false,
            ArgType::ArrayOf(inner) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| inner.matches_value(item))),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Any => f.write_str("any"),
            ArgType::Null => f.write_str("null"),
            ArgType::Boolean => f.write_str("boolean"),
            ArgType::Number => f.write_str("number"),
            ArgType::String => f.write_str("string"),
            ArgType::Array => f.write_str("array"),
            ArgType::Object => f.write_str("object"),
            ArgType::Expression => f.write_str("expression"),
            ArgType::ArrayOf(inner) => write!(f, "array-{inner}"),
        }
    }
}

/// Declared argument positions, each a list of accepted alternatives.
/// An empty list accepts anything. A variadic signature requires at least
/// as many arguments as declared positions, and the last position also
/// applies to every extra argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub arguments: Vec<Vec<ArgType>>,
    pub variadic: bool,
}

impl Signature {
    pub fn new(arguments: Vec<Vec<ArgType>>) -> Self {
        Self { arguments, variadic: false }
    }

    pub fn variadic(arguments: Vec<Vec<ArgType>>) -> Self {
        Self { arguments, variadic: true }
    }

    pub fn check_arity(&self, actual: usize) -> Result<(), FunctionError> {
        let expected = self.arguments.len();
        if self.variadic {
            if actual < expected {
                return Err(FunctionError::VariadicArity { expected, actual });
            }
        } else if actual != expected {
            return Err(FunctionError::Arity { expected, actual });
        }
        Ok(())
    }

    pub fn check_types(&self, args: &[Argument<'_>]) -> Result<(), FunctionError> {
        for (position, arg) in args.iter().enumerate() {
            let accepted = match self.arguments.get(position) {
                Some(accepted) => accepted,
                None if self.variadic => match self.arguments.last() {
                    Some(accepted) => accepted,
                    None => continue,
                },
                None => continue,
            };
            check_argument(accepted, arg)?;
        }
        Ok(())
    }
}

fn check_argument(accepted: &[ArgType], arg: &Argument<'_>) -> Result<(), FunctionError> {
    if accepted.is_empty() || accepted.iter().any(|t| t.matches(arg)) {
        return Ok(());
    }

    // For a mixed array, blame the first element that breaks the array-of
    // alternative selected by the first element's type.
    if let Argument::Value(Value::Array(items)) = arg {
        if let Some(first) = items.first() {
            let element_type = accepted.iter().find_map(|t| match t {
                ArgType::ArrayOf(inner) if inner.matches_value(first) => Some(*inner),
                _ => None,
            });
            if let Some(inner) = element_type {
                if let Some(bad) = items.iter().find(|item| !inner.matches_value(item)) {
                    return Err(FunctionError::InvalidType {
                        current_value: bad.clone(),
                        expected_types: vec![inner.to_string()],
                        actual_type: type_name(bad).to_string(),
                    });
                }
            }
        }
    }

    Err(FunctionError::InvalidType {
        current_value: arg.clone().into_value(),
        expected_types: accepted.iter().map(ToString::to_string).collect(),
        actual_type: arg.type_name().to_string(),
    })
}
