//! Decoding functions used by the event envelopes: `powertools_json`,
//! `powertools_base64` and `powertools_base64_gzip`.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use serde_json::Value;

use super::*;

pub(crate) fn register_all(registry: &mut Registry) {
    registry.register(PowertoolsJson);
    registry.register(PowertoolsBase64);
    registry.register(PowertoolsBase64Gzip);
}

/// Parse a string holding a JSON document.
pub struct PowertoolsJson;
impl Function for PowertoolsJson {
    fn name(&self) -> &'static str { "powertools_json" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::String]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let text = string_arg(args)?;
        serde_json::from_str(&text).map_err(|e| FunctionError::Custom(format!("invalid JSON: {e}")))
    }
}

pub struct PowertoolsBase64;
impl Function for PowertoolsBase64 {
    fn name(&self) -> &'static str { "powertools_base64" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::String]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let bytes = decode_base64(&string_arg(args)?)?;
        utf8(bytes).map(Value::String)
    }
}

/// Base64, then gzip, then UTF-8. CloudWatch Logs subscriptions deliver
/// their payload this way.
pub struct PowertoolsBase64Gzip;
impl Function for PowertoolsBase64Gzip {
    fn name(&self) -> &'static str { "powertools_base64_gzip" }
    fn signature(&self) -> Signature { Signature::new(vec![vec![ArgType::String]]) }
    fn call(&self, args: Vec<Argument<'_>>) -> Result<Value, FunctionError> {
        let compressed = decode_base64(&string_arg(args)?)?;
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut bytes = Vec::new();
        decoder
            .read_to_end(&mut bytes)
            .map_err(|e| FunctionError::Custom(format!("invalid gzip data: {e}")))?;
        utf8(bytes).map(Value::String)
    }
}

fn string_arg(args: Vec<Argument<'_>>) -> Result<String, FunctionError> {
    match args.into_iter().next().map(Argument::into_value) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(FunctionError::InvalidType {
            actual_type: type_name(&other).to_string(),
            current_value: other,
            expected_types: vec!["string".into()],
        }),
        None => Err(FunctionError::Arity { expected: 1, actual: 0 }),
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>, FunctionError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| FunctionError::Custom(format!("invalid base64: {e}")))
}

fn utf8(bytes: Vec<u8>) -> Result<String, FunctionError> {
    String::from_utf8(bytes).map_err(|e| FunctionError::Custom(format!("invalid UTF-8: {e}")))
}
