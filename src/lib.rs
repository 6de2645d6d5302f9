//! A JMESPath expression engine over `serde_json::Value`.
//!
//! ```
//! use jmespath_engine::{search, SearchOptions};
//! use serde_json::json;
//!
//! let data = json!({"people": [{"name": "a", "age": 30}, {"name": "b", "age": 25}]});
//! let names = search("sort_by(people, &age)[*].name", &data, &SearchOptions::default()).unwrap();
//! assert_eq!(names, json!(["b", "a"]));
//! ```

pub mod ast;
pub mod context;
pub mod engine;
pub mod envelopes;
pub mod errors;
pub mod functions; // plugin model
pub mod interpreter;
pub mod lexer;
pub mod parser;
mod comparison;
mod value;

pub use context::SearchOptions;
pub use engine::{compile, purge_cache, search, search_json};
pub use errors::{FunctionError, JmesPathError, Result};
pub use functions::{ArgType, Argument, Function, Registry, Signature};
pub use interpreter::{Expression, TreeInterpreter};
pub use parser::{ParsedResult, Parser};
