use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use jmespath_engine::envelopes::{self, extract_data_from_envelope};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

fn gzip_base64(text: &str) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

#[test]
fn test_api_gateway_body() {
    let event = json!({"body": "{\"message\": \"hello\"}", "httpMethod": "POST"});
    assert_eq!(
        extract_data_from_envelope(&event, envelopes::API_GATEWAY_REST, None).unwrap(),
        json!({"message": "hello"})
    );
}

#[test]
fn test_eventbridge_detail() {
    let event = json!({"detail-type": "x", "detail": {"id": "abc"}});
    assert_eq!(
        extract_data_from_envelope(&event, envelopes::EVENTBRIDGE, None).unwrap(),
        json!({"id": "abc"})
    );
}

#[test]
fn test_kinesis_data_stream() {
    let event = json!({
        "Records": [
            {"kinesis": {"data": STANDARD.encode("{\"seq\": 1}")}},
            {"kinesis": {"data": STANDARD.encode("{\"seq\": 2}")}}
        ]
    });
    assert_eq!(
        extract_data_from_envelope(&event, envelopes::KINESIS_DATA_STREAM, None).unwrap(),
        json!([{"seq": 1}, {"seq": 2}])
    );
}

#[test]
fn test_cloudwatch_logs() {
    let payload = r#"{"logGroup": "/aws/lambda/x", "logEvents": [{"id": "1", "message": "a"}, {"id": "2", "message": "b"}]}"#;
    let event = json!({"awslogs": {"data": gzip_base64(payload)}});
    assert_eq!(
        extract_data_from_envelope(&event, envelopes::CLOUDWATCH_LOGS, None).unwrap(),
        json!([{"id": "1", "message": "a"}, {"id": "2", "message": "b"}])
    );
}

#[test]
fn test_s3_over_sns_over_sqs() {
    let s3_event = json!({"Records": [{"s3": {"bucket": {"name": "b"}}}]});
    let sns = json!({"Message": s3_event.to_string()});
    let event = json!({"Records": [{"body": sns.to_string()}]});
    assert_eq!(
        extract_data_from_envelope(&event, envelopes::S3_SNS_SQS, None).unwrap(),
        json!([{"s3": {"bucket": {"name": "b"}}}])
    );
}

#[test]
fn test_s3_kinesis_firehose() {
    let s3_event = json!({"Records": [{"eventName": "ObjectCreated:Put"}]});
    let event = json!({"records": [{"data": STANDARD.encode(s3_event.to_string())}]});
    assert_eq!(
        extract_data_from_envelope(&event, envelopes::S3_KINESIS_FIREHOSE, None).unwrap(),
        json!([{"eventName": "ObjectCreated:Put"}])
    );
}

#[test]
fn test_bad_payload_is_a_function_error() {
    let event = json!({"body": "not json"});
    let err = extract_data_from_envelope(&event, envelopes::API_GATEWAY_HTTP, None).unwrap_err();
    assert!(err.is_function_error());
    assert!(err.to_string().starts_with("Error in function powertools_json(): invalid JSON"));
}
