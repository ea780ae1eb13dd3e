use serde::{Deserialize, Serialize};

/// Classification of one retrieved body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Usable(String),
    TooShort(usize),
    Blocked(String),
    Empty,
}

/// Body-free form of a verdict, kept on the retrieval trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VerdictSummary {
    Usable,
    TooShort { length: usize },
    Blocked { signature: String },
    Empty,
}

impl ValidationVerdict {
    pub fn is_usable(&self) -> bool {
        matches!(self, ValidationVerdict::Usable(_))
    }

    pub fn summary(&self) -> VerdictSummary {
        match self {
            ValidationVerdict::Usable(_) => VerdictSummary::Usable,
            ValidationVerdict::TooShort(length) => VerdictSummary::TooShort { length: *length },
            ValidationVerdict::Blocked(signature) => VerdictSummary::Blocked {
                signature: signature.clone(),
            },
            ValidationVerdict::Empty => VerdictSummary::Empty,
        }
    }

    /// Keeps whichever of two non-usable verdicts tells the caller more.
    ///
    /// `Blocked` beats `TooShort` beats `Empty`; on a tie the later verdict wins.
    pub fn most_actionable(self, later: ValidationVerdict) -> ValidationVerdict {
        if later.rank() >= self.rank() {
            later
        } else {
            self
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ValidationVerdict::Empty => 0,
            ValidationVerdict::TooShort(_) => 1,
            ValidationVerdict::Blocked(_) => 2,
            ValidationVerdict::Usable(_) => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub min_content_length: usize,
    pub blocked_signatures: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_content_length: 512,
            blocked_signatures: [
                "cf-browser-verification",
                "cf_chl_opt",
                "<title>Just a moment...</title>",
                "<title>Attention Required! | Cloudflare</title>",
                "<title>Access denied",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Backend-independent gate between retrieval and extraction.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    min_content_length: usize,
    // (original, lowercased) pairs; matching is case-insensitive.
    signatures: Vec<(String, String)>,
}

impl ContentValidator {
    pub fn new(settings: &ValidationSettings) -> Self {
        let signatures = settings
            .blocked_signatures
            .iter()
            .filter(|sig| !sig.trim().is_empty())
            .map(|sig| (sig.clone(), sig.to_lowercase()))
            .collect();
        Self {
            min_content_length: settings.min_content_length,
            signatures,
        }
    }

    pub fn validate(&self, body: Option<&str>) -> ValidationVerdict {
        let body = match body {
            Some(body) if !body.is_empty() => body,
            _ => return ValidationVerdict::Empty,
        };
        if body.len() < self.min_content_length {
            return ValidationVerdict::TooShort(body.len());
        }
        let lowered = body.to_lowercase();
        if let Some((original, _)) = self
            .signatures
            .iter()
            .find(|(_, needle)| lowered.contains(needle.as_str()))
        {
            return ValidationVerdict::Blocked(original.clone());
        }
        ValidationVerdict::Usable(body.to_string())
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(&ValidationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(text: &str) -> String {
        format!("<html><body>{text}{}</body></html>", " ".repeat(600))
    }

    #[test]
    fn absent_and_empty_bodies_are_empty() {
        let validator = ContentValidator::default();
        assert_eq!(validator.validate(None), ValidationVerdict::Empty);
        assert_eq!(validator.validate(Some("")), ValidationVerdict::Empty);
    }

    #[test]
    fn short_body_reports_its_length() {
        let validator = ContentValidator::default();
        assert_eq!(
            validator.validate(Some("<html></html>")),
            ValidationVerdict::TooShort(13)
        );
    }

    #[test]
    fn length_check_runs_before_signature_check() {
        let validator = ContentValidator::default();
        let verdict = validator.validate(Some("Just a moment..."));
        assert_eq!(verdict, ValidationVerdict::TooShort(16));
    }

    #[test]
    fn signature_match_is_case_insensitive() {
        let validator = ContentValidator::default();
        let verdict = validator.validate(Some(&padded("<title>JUST A MOMENT...</title>")));
        assert_eq!(
            verdict,
            ValidationVerdict::Blocked("<title>Just a moment...</title>".into())
        );
    }

    #[test]
    fn detection_script_on_a_normal_page_is_not_a_challenge() {
        let validator = ContentValidator::default();
        let body = padded(
            "<h3>التعليقات (3)</h3>\
             <script src=\"/cdn-cgi/challenge-platform/scripts/jsd/main.js\"></script>",
        );
        assert!(validator.validate(Some(&body)).is_usable());
    }

    #[test]
    fn denial_phrases_in_comments_are_not_a_challenge() {
        let validator = ContentValidator::default();
        let body = padded(
            "<title>طلب تصميم</title><div class=\"comment\">Access denied when I log in, \
             also saw Just a moment... twice</div>",
        );
        assert!(validator.validate(Some(&body)).is_usable());

        let denied = padded("<title>Access denied | khamsat.com used Cloudflare</title>");
        assert_eq!(
            validator.validate(Some(&denied)),
            ValidationVerdict::Blocked("<title>Access denied".into())
        );
    }

    #[test]
    fn clean_body_is_usable() {
        let validator = ContentValidator::default();
        let body = padded("<h3>التعليقات (3)</h3>");
        assert_eq!(
            validator.validate(Some(&body)),
            ValidationVerdict::Usable(body.clone())
        );
    }

    #[test]
    fn thresholds_come_from_settings() {
        let validator = ContentValidator::new(&ValidationSettings {
            min_content_length: 4,
            blocked_signatures: vec!["denied".into(), "  ".into()],
        });
        assert_eq!(validator.validate(Some("abc")), ValidationVerdict::TooShort(3));
        assert_eq!(
            validator.validate(Some("Denied!")),
            ValidationVerdict::Blocked("denied".into())
        );
        assert!(validator.validate(Some("fine body")).is_usable());
    }

    #[test]
    fn blocked_outranks_too_short_outranks_empty() {
        let blocked = ValidationVerdict::Blocked("x".into());
        let short = ValidationVerdict::TooShort(3);
        assert_eq!(
            blocked.clone().most_actionable(short.clone()),
            blocked.clone()
        );
        assert_eq!(
            ValidationVerdict::Empty.most_actionable(short.clone()),
            short.clone()
        );
        assert_eq!(short.clone().most_actionable(ValidationVerdict::Empty), short);
    }
}
