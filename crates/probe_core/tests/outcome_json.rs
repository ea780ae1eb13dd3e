use std::time::Duration;

use pretty_assertions::assert_eq;
use probe_core::{
    ContentValidator, ErrorKind, ExtractionAttempt, PipelineOutcome, RetrievalAttempt,
};
use serde_json::json;

fn usable_attempt() -> RetrievalAttempt {
    let body = format!("<html>{}</html>", "x".repeat(600));
    let verdict = ContentValidator::default().validate(Some(&body));
    RetrievalAttempt::responded(
        "direct",
        "https://khamsat.com/community/requests/1",
        200,
        body,
        Duration::from_millis(5),
    )
    .with_verdict(&verdict)
}

#[test]
fn found_outcome_serializes_flat_camel_case_record() {
    probe_logging::initialize_for_tests();
    let outcome = PipelineOutcome::found(
        "1",
        0,
        "direct",
        "raw-pattern",
        vec![usable_attempt()],
        vec![ExtractionAttempt::matched("raw-pattern", 0, "التعليقات (0)")],
    );

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["commentsCount"], json!(0));
    assert_eq!(value["found"], json!(true));
    assert_eq!(value["method"], json!("direct:raw-pattern"));
    assert_eq!(value["errorKind"], json!(null));

    let attempt = &value["retrievalTrail"][0];
    assert_eq!(attempt["backendName"], json!("direct"));
    assert_eq!(attempt["httpStatus"], json!(200));
    assert_eq!(attempt["bodyLength"], json!(613));
    assert_eq!(attempt["verdict"], json!({"kind": "usable"}));
    assert!(attempt.get("body").is_none());

    let strategy = &value["extractionTrail"][0];
    assert_eq!(strategy["strategyName"], json!("raw-pattern"));
    assert_eq!(strategy["matched"], json!(true));
    assert_eq!(strategy["value"], json!(0));
}

#[test]
fn not_found_outcome_keeps_trail_and_error_kind() {
    let failed = RetrievalAttempt::failed(
        "scraperapi",
        "https://api.example.com/?api_key=REDACTED",
        None,
        "timeout",
        Duration::from_secs(1),
    );
    let outcome = PipelineOutcome::not_found("1", ErrorKind::RetrievalExhausted, vec![failed], vec![]);

    assert!(!outcome.is_found());
    assert_eq!(outcome.comments_count(), None);
    assert_eq!(outcome.method(), None);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["commentsCount"], json!(null));
    assert_eq!(value["found"], json!(false));
    assert_eq!(value["errorKind"], json!("RetrievalExhausted"));
    assert_eq!(value["retrievalTrail"][0]["failureReason"], json!("timeout"));
    assert_eq!(value["retrievalTrail"][0]["succeeded"], json!(false));
}

#[test]
fn minimal_view_has_only_count_and_flag() {
    let outcome = PipelineOutcome::found("abc", 7, "direct", "raw-pattern", vec![], vec![]);
    let value = serde_json::to_value(outcome.minimal()).unwrap();
    assert_eq!(
        value,
        json!({"targetIdentifier": "abc", "commentsCount": 7, "found": true})
    );
}

#[test]
fn blocked_verdict_summary_names_signature() {
    let body = format!("<title>Just a moment...</title>{}", " ".repeat(600));
    let verdict = ContentValidator::default().validate(Some(&body));
    let attempt = RetrievalAttempt::responded("direct", "u", 403, body, Duration::ZERO)
        .with_failure("http status 403")
        .with_verdict(&verdict);
    let value = serde_json::to_value(&attempt).unwrap();
    assert_eq!(
        value["verdict"],
        json!({"kind": "blocked", "signature": "<title>Just a moment...</title>"})
    );
}
