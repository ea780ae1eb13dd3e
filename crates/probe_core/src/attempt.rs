use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::validate::{ValidationVerdict, VerdictSummary};

/// Record of one backend tried during a run.
///
/// The raw body is kept in memory for the caller but never serialized; the
/// serialized trail carries its length and SHA-256 digest instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalAttempt {
    pub backend_name: String,
    pub target_url: String,
    pub succeeded: bool,
    pub http_status: Option<u16>,
    #[serde(skip)]
    pub body: Option<String>,
    pub body_length: Option<usize>,
    pub body_digest: Option<String>,
    pub elapsed_ms: u64,
    pub failure_reason: Option<String>,
    pub verdict: Option<VerdictSummary>,
}

impl RetrievalAttempt {
    /// An attempt that got a response with a body, whatever its status.
    pub fn responded(
        backend_name: impl Into<String>,
        target_url: impl Into<String>,
        http_status: u16,
        body: String,
        elapsed: Duration,
    ) -> Self {
        let digest = format!("{:x}", Sha256::digest(body.as_bytes()));
        Self {
            backend_name: backend_name.into(),
            target_url: target_url.into(),
            succeeded: true,
            http_status: Some(http_status),
            body_length: Some(body.len()),
            body_digest: Some(digest),
            body: Some(body),
            elapsed_ms: elapsed.as_millis() as u64,
            failure_reason: None,
            verdict: None,
        }
    }

    /// An attempt that produced no body at all.
    pub fn failed(
        backend_name: impl Into<String>,
        target_url: impl Into<String>,
        http_status: Option<u16>,
        reason: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            backend_name: backend_name.into(),
            target_url: target_url.into(),
            succeeded: false,
            http_status,
            body: None,
            body_length: None,
            body_digest: None,
            elapsed_ms: elapsed.as_millis() as u64,
            failure_reason: Some(reason.into()),
            verdict: None,
        }
    }

    /// Marks a responded attempt as failed while keeping its body for diagnostics.
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.succeeded = false;
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn with_verdict(mut self, verdict: &ValidationVerdict) -> Self {
        self.verdict = Some(verdict.summary());
        self
    }
}

/// Record of one extraction strategy tried against a usable body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionAttempt {
    pub strategy_name: String,
    pub matched: bool,
    pub value: Option<u32>,
    pub evidence_text: Option<String>,
    /// Outer HTML of the heading a structured match came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_html: Option<String>,
    /// Outer HTML of the closest comments container around that heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_html: Option<String>,
}

impl ExtractionAttempt {
    pub fn matched(strategy_name: impl Into<String>, value: u32, evidence: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            matched: true,
            value: Some(value),
            evidence_text: Some(evidence.into()),
            header_html: None,
            container_html: None,
        }
    }

    pub fn missed(strategy_name: impl Into<String>, evidence: Option<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            matched: false,
            value: None,
            evidence_text: evidence,
            header_html: None,
            container_html: None,
        }
    }

    pub fn with_header_block(mut self, header: String, container: Option<String>) -> Self {
        self.header_html = Some(header);
        self.container_html = container;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responded_attempt_records_length_and_digest() {
        let attempt = RetrievalAttempt::responded(
            "direct",
            "https://example.com/x",
            200,
            "abc".to_string(),
            Duration::from_millis(42),
        );
        assert!(attempt.succeeded);
        assert_eq!(attempt.body_length, Some(3));
        assert_eq!(
            attempt.body_digest.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(attempt.elapsed_ms, 42);
    }

    #[test]
    fn with_failure_keeps_body() {
        let attempt = RetrievalAttempt::responded(
            "direct",
            "https://example.com/x",
            403,
            "denied".to_string(),
            Duration::ZERO,
        )
        .with_failure("http status 403");
        assert!(!attempt.succeeded);
        assert_eq!(attempt.body.as_deref(), Some("denied"));
        assert_eq!(attempt.failure_reason.as_deref(), Some("http status 403"));
    }

    #[test]
    fn header_block_is_serialized_only_when_present() {
        let plain = ExtractionAttempt::matched("structured-selector", 2, "التعليقات (2)");
        let value = serde_json::to_value(&plain).unwrap();
        assert!(value.get("headerHtml").is_none());
        assert!(value.get("containerHtml").is_none());

        let located = plain.with_header_block(
            "<h3>التعليقات (2)</h3>".to_string(),
            Some("<div class=\"card\"><h3>التعليقات (2)</h3></div>".to_string()),
        );
        let value = serde_json::to_value(&located).unwrap();
        assert_eq!(value["headerHtml"], "<h3>التعليقات (2)</h3>");
        assert_eq!(value["evidenceText"], "التعليقات (2)");
        assert!(value["containerHtml"].as_str().unwrap().starts_with("<div class=\"card\">"));
    }
}
