use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::context::SearchOptions;
use crate::errors::{JmesPathError, Result};
use crate::parser::{ParsedResult, Parser};

/// Process-wide parser backing `compile` and `search`.
static PARSER: Lazy<Parser> = Lazy::new(Parser::new);

/// Parse `expression`, reusing a cached result when one exists.
pub fn compile(expression: &str) -> Result<Arc<ParsedResult>> {
    PARSER.parse(expression)
}

/// Compile `expression` and evaluate it against `data`.
pub fn search(expression: &str, data: &Value, options: &SearchOptions) -> Result<Value> {
    compile(expression)?.search(data, options)
}

/// Convenience: parse a JSON document and evaluate `expression` with the
/// builtin functions.
pub fn search_json(json_text: &str, expression: &str) -> Result<Value> {
    let data: Value =
        serde_json::from_str(json_text).map_err(|e| JmesPathError::InvalidJson(e.to_string()))?;
    search(expression, &data, &SearchOptions::default())
}

/// Drop every cached expression held by the global parser.
pub fn purge_cache() {
    PARSER.purge_cache();
}
