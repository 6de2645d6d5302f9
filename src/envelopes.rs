//! Expressions that unwrap the payload of common AWS event shapes.
//!
//! ```
//! use jmespath_engine::envelopes::{extract_data_from_envelope, EVENTBRIDGE};
//! use serde_json::json;
//!
//! let event = json!({"detail": {"id": 7}});
//! let payload = extract_data_from_envelope(&event, EVENTBRIDGE, None).unwrap();
//! assert_eq!(payload, json!({"id": 7}));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::context::SearchOptions;
use crate::engine::search;
use crate::errors::Result;
use crate::functions::Registry;

static POWERTOOLS: Lazy<SearchOptions> =
    Lazy::new(|| SearchOptions::with_functions(Registry::with_powertools()));

pub const API_GATEWAY_REST: &str = "powertools_json(body)";
pub const API_GATEWAY_HTTP: &str = "powertools_json(body)";
pub const SQS: &str = "Records[*].powertools_json(body)";
pub const SNS: &str = "Records[0].Sns.Message | powertools_json(@)";
pub const EVENTBRIDGE: &str = "detail";
pub const CLOUDWATCH_EVENTS_SCHEDULED: &str = "detail";
pub const KINESIS_DATA_STREAM: &str = "Records[*].kinesis.powertools_json(powertools_base64(data))";
pub const CLOUDWATCH_LOGS: &str =
    "awslogs.powertools_base64_gzip(data) | powertools_json(@).logEvents[*]";
pub const S3_SNS_SQS: &str =
    "Records[*].powertools_json(body).powertools_json(Message).Records[0]";
pub const S3_SQS: &str = "Records[*].powertools_json(body).Records[0]";
pub const S3_SNS_KINESIS_FIREHOSE: &str =
    "records[*].powertools_json(powertools_base64(data)).powertools_json(Message).Records[0]";
pub const S3_KINESIS_FIREHOSE: &str =
    "records[*].powertools_json(powertools_base64(data)).Records[0]";
pub const S3_EVENTBRIDGE_SQS: &str = "Records[*].powertools_json(body).detail";

/// Evaluate `envelope` against `data`. Without `options` the builtins plus
/// the `powertools_*` functions are available.
pub fn extract_data_from_envelope(
    data: &Value,
    envelope: &str,
    options: Option<&SearchOptions>,
) -> Result<Value> {
    search(envelope, data, options.unwrap_or(&*POWERTOOLS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::JmesPathError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sqs_bodies_are_decoded() {
        let event = json!({
            "Records": [
                {"body": "{\"customerId\": \"dd4649e6\"}"},
                {"body": "{\"customerId\": \"7a8e2f11\"}"}
            ]
        });
        assert_eq!(
            extract_data_from_envelope(&event, SQS, None).unwrap(),
            json!([{"customerId": "dd4649e6"}, {"customerId": "7a8e2f11"}])
        );
    }

    #[test]
    fn sns_message_is_decoded() {
        let event = json!({"Records": [{"Sns": {"Message": "{\"a\": 1}"}}]});
        assert_eq!(extract_data_from_envelope(&event, SNS, None).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn explicit_options_replace_powertools() {
        let event = json!({"body": "{}"});
        let err = extract_data_from_envelope(&event, API_GATEWAY_REST, Some(&SearchOptions::default()))
            .unwrap_err();
        assert!(matches!(err, JmesPathError::UnknownFunction { ref name, .. } if name == "powertools_json"));
    }
}
