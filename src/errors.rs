use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;

use crate::lexer::TokenKind;

/// Every error surfaced by compiling or evaluating an expression.
///
/// Lex and parse errors get their `expression` filled in by the parser once
/// they reach the top of `parse`; evaluation errors get it from
/// `ParsedResult::search`. Until then the field is `None` and the message has
/// no expression suffix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JmesPathError {
    #[error("Invalid JMESPath expression: cannot be empty.")]
    EmptyExpression,

    #[error(
        "Bad jmespath expression: unknown token \"{value}\" at column {position}{}",
        in_expression(.expression)
    )]
    Lexer {
        position: usize,
        value: String,
        expression: Option<String>,
    },

    #[error(
        "Invalid jmespath expression: parse error at column {position}, {}{}",
        parse_issue(.token_value, .token_kind, .reason),
        in_expression(.expression)
    )]
    Parse {
        position: usize,
        token_value: String,
        token_kind: TokenKind,
        reason: Option<String>,
        expression: Option<String>,
    },

    /// A parse error raised on the `eof` token.
    #[error(
        "Invalid jmespath expression: parse error at column {position}, found unexpected end of expression (EOF){}",
        in_expression(.expression)
    )]
    IncompleteExpression {
        position: usize,
        expression: Option<String>,
    },

    #[error(
        "Expected {} {expected} {} for function {function}(), received {actual}{}",
        arity_bound(.expected, .actual),
        pluralize(.expected),
        in_expression(.expression)
    )]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
        expression: Option<String>,
    },

    #[error(
        "Expected {expected} {} for function {function}(), received {actual}{}",
        pluralize(.expected),
        in_expression(.expression)
    )]
    VariadicArity {
        function: String,
        expected: usize,
        actual: usize,
        expression: Option<String>,
    },

    #[error(
        "Invalid argument type for function {function}(), expected {} but found \"{actual_type}\"{}",
        expected_one_of(.expected_types),
        in_expression(.expression)
    )]
    InvalidType {
        function: String,
        current_value: Value,
        expected_types: Vec<String>,
        actual_type: String,
        expression: Option<String>,
    },

    #[error("Unknown function: {name}(){}", in_expression(.expression))]
    UnknownFunction {
        name: String,
        expression: Option<String>,
    },

    #[error("Invalid slice, step cannot be 0{}", in_expression(.expression))]
    InvalidSlice { expression: Option<String> },

    /// Failure raised by a function body after its signature was accepted.
    #[error("Error in function {function}(): {message}{}", in_expression(.expression))]
    Function {
        function: String,
        message: String,
        expression: Option<String>,
    },

    #[error("invalid JSON document: {0}")]
    InvalidJson(String),
}

impl JmesPathError {
    /// Attach the source expression, keeping the first one if already set.
    pub fn with_expression(mut self, source: &str) -> Self {
        if let Some(slot) = self.expression_slot() {
            if slot.is_none() {
                *slot = Some(source.to_string());
            }
        }
        self
    }

    pub fn expression(&self) -> Option<&str> {
        match self {
            JmesPathError::Lexer { expression, .. }
            | JmesPathError::Parse { expression, .. }
            | JmesPathError::IncompleteExpression { expression, .. }
            | JmesPathError::Arity { expression, .. }
            | JmesPathError::VariadicArity { expression, .. }
            | JmesPathError::InvalidType { expression, .. }
            | JmesPathError::UnknownFunction { expression, .. }
            | JmesPathError::InvalidSlice { expression }
            | JmesPathError::Function { expression, .. } => expression.as_deref(),
            JmesPathError::EmptyExpression | JmesPathError::InvalidJson(_) => None,
        }
    }

    /// `IncompleteExpression` is a specialisation of `Parse`.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            JmesPathError::Parse { .. } | JmesPathError::IncompleteExpression { .. }
        )
    }

    pub fn is_function_error(&self) -> bool {
        matches!(
            self,
            JmesPathError::Arity { .. }
                | JmesPathError::VariadicArity { .. }
                | JmesPathError::InvalidType { .. }
                | JmesPathError::UnknownFunction { .. }
                | JmesPathError::Function { .. }
        )
    }

    fn expression_slot(&mut self) -> Option<&mut Option<String>> {
        match self {
            JmesPathError::Lexer { expression, .. }
            | JmesPathError::Parse { expression, .. }
            | JmesPathError::IncompleteExpression { expression, .. }
            | JmesPathError::Arity { expression, .. }
            | JmesPathError::VariadicArity { expression, .. }
            | JmesPathError::InvalidType { expression, .. }
            | JmesPathError::UnknownFunction { expression, .. }
            | JmesPathError::InvalidSlice { expression }
            | JmesPathError::Function { expression, .. } => Some(expression),
            JmesPathError::EmptyExpression | JmesPathError::InvalidJson(_) => None,
        }
    }
}

/// Errors raised while checking or running a function. They do not know the
/// function's name; the caller that dispatched the call attaches it with
/// [`FunctionError::named`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("expected {} {expected} {}, received {actual}", arity_bound(.expected, .actual), pluralize(.expected))]
    Arity { expected: usize, actual: usize },

    #[error("expected {expected} {}, received {actual}", pluralize(.expected))]
    VariadicArity { expected: usize, actual: usize },

    #[error("expected {} but found \"{actual_type}\"", expected_one_of(.expected_types))]
    InvalidType {
        current_value: Value,
        expected_types: Vec<String>,
        actual_type: String,
    },

    #[error("{0}")]
    Custom(String),

    /// An error from evaluating an expression reference inside the function.
    #[error(transparent)]
    Evaluation(Box<JmesPathError>),
}

impl FunctionError {
    pub fn named(self, function: &str) -> JmesPathError {
        let function = function.to_string();
        match self {
            FunctionError::Arity { expected, actual } => JmesPathError::Arity {
                function,
                expected,
                actual,
                expression: None,
            },
            FunctionError::VariadicArity { expected, actual } => JmesPathError::VariadicArity {
                function,
                expected,
                actual,
                expression: None,
            },
            FunctionError::InvalidType {
                current_value,
                expected_types,
                actual_type,
            } => JmesPathError::InvalidType {
                function,
                current_value,
                expected_types,
                actual_type,
                expression: None,
            },
            FunctionError::Custom(message) => JmesPathError::Function {
                function,
                message,
                expression: None,
            },
            FunctionError::Evaluation(inner) => *inner,
        }
    }
}

impl From<JmesPathError> for FunctionError {
    fn from(err: JmesPathError) -> Self {
        FunctionError::Evaluation(Box::new(err))
    }
}

// Type alias for results that use `JmesPathError` as the error type
pub type Result<T> = std::result::Result<T, JmesPathError>;

fn in_expression(expression: &Option<String>) -> String {
    match expression {
        Some(expression) => format!(" in expression: {expression}"),
        None => String::new(),
    }
}

fn parse_issue(token_value: &str, token_kind: &TokenKind, reason: &Option<String>) -> String {
    match reason {
        Some(reason) => reason.clone(),
        None => format!("found unexpected token \"{token_value}\" ({token_kind})"),
    }
}

fn arity_bound(expected: &usize, actual: &usize) -> &'static str {
    if actual > expected {
        "at most"
    } else {
        "at least"
    }
}

fn pluralize(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

fn expected_one_of(types: &[String]) -> String {
    match types {
        [single] => format!("\"{single}\""),
        _ => format!(
            "one of {}",
            types.iter().map(|t| format!("\"{t}\"")).join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_gain_expression_suffix_once() {
        let err = JmesPathError::Lexer {
            position: 4,
            value: "#".into(),
            expression: None,
        };
        assert_eq!(err.to_string(), "Bad jmespath expression: unknown token \"#\" at column 4");
        let err = err.with_expression("foo[#]").with_expression("other");
        assert_eq!(
            err.to_string(),
            "Bad jmespath expression: unknown token \"#\" at column 4 in expression: foo[#]"
        );
    }

    #[test]
    fn function_errors_are_named_by_the_caller() {
        let err = FunctionError::Arity { expected: 1, actual: 2 }.named("abs");
        assert_eq!(
            err.to_string(),
            "Expected at most 1 argument for function abs(), received 2"
        );
        let err = FunctionError::InvalidType {
            current_value: Value::Null,
            expected_types: vec!["array-number".into(), "array-string".into()],
            actual_type: "null".into(),
        }
        .named("sort");
        assert_eq!(
            err.to_string(),
            "Invalid argument type for function sort(), expected one of \"array-number\", \"array-string\" but found \"null\""
        );
    }

    #[test]
    fn nested_evaluation_errors_pass_through_unchanged() {
        let inner = JmesPathError::UnknownFunction {
            name: "nope".into(),
            expression: None,
        };
        let err = FunctionError::from(inner.clone()).named("map");
        assert_eq!(err, inner);
    }

    #[test]
    fn incomplete_expression_is_a_parse_error() {
        let err = JmesPathError::IncompleteExpression {
            position: 1,
            expression: None,
        };
        assert!(err.is_parse_error());
        assert!(!err.is_function_error());
    }
}
