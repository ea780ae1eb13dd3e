//! Comment-count extraction.
//!
//! Strategies run in a fixed order against one usable body, and the first
//! count that passes the sanity ceiling wins. Disagreeing strategies are never
//! reconciled: order alone decides.

use std::cell::OnceCell;

use ego_tree::NodeRef;
use probe_core::ExtractionAttempt;
use probe_logging::{probe_debug, probe_info};
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

const DIGITS: &str = "[0-9\u{0660}-\u{0669}\u{06F0}-\u{06F9}]+";
const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];
const HEADER_CONTAINERS: [&str; 3] = [".card-header", "header", "[class*=\"header\"]"];
const COMMENT_CONTAINERS: &str = ".comments, .card, .box, .comments-list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Text that labels the comments section header.
    pub label: String,
    /// Largest count accepted as plausible.
    pub max_count: u32,
    /// CSS selector matching one rendered comment.
    pub comment_selector: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            label: "التعليقات".to_string(),
            max_count: 1000,
            comment_selector: ".comment-item, .comment, [data-comment-id]".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionSetupError {
    #[error("extraction label must not be empty")]
    EmptyLabel,
    #[error("invalid comment selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("label does not form a usable pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One usable body, parsed on first use and shared by every strategy.
pub struct ExtractionInput<'a> {
    raw: &'a str,
    max_count: u32,
    document: OnceCell<Html>,
    text: OnceCell<String>,
}

impl<'a> ExtractionInput<'a> {
    pub fn new(raw: &'a str, max_count: u32) -> Self {
        Self {
            raw,
            max_count,
            document: OnceCell::new(),
            text: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw
    }

    pub fn document(&self) -> &Html {
        self.document.get_or_init(|| Html::parse_document(self.raw))
    }

    /// Visible text of the document with whitespace collapsed; script and
    /// style contents are left out.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            let mut out = String::new();
            collect_text(*self.document().root_element(), &mut out);
            collapse_whitespace(&out)
        })
    }

    /// Judges one candidate count against the ceiling.
    fn judge(&self, strategy: &str, value: Option<u64>, evidence: &str) -> ExtractionAttempt {
        match value {
            Some(value) if value <= u64::from(self.max_count) => {
                ExtractionAttempt::matched(strategy, value as u32, evidence)
            }
            _ => ExtractionAttempt::missed(
                strategy,
                Some(format!(
                    "rejected {:?}: above ceiling {}",
                    evidence, self.max_count
                )),
            ),
        }
    }

    fn within_ceiling(&self, value: Option<u64>) -> bool {
        matches!(value, Some(value) if value <= u64::from(self.max_count))
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn attempt(&self, input: &ExtractionInput<'_>) -> ExtractionAttempt;
}

/// Label token followed by a parenthesized integer, searched in the unparsed body.
pub struct RawPatternStrategy {
    pattern: Regex,
}

impl RawPatternStrategy {
    pub const NAME: &'static str = "raw-pattern";

    pub fn new(label: &str) -> Result<Self, ExtractionSetupError> {
        let pattern = format!(r"{}\s*\(\s*({DIGITS})\s*\)", regex::escape(label));
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }
}

impl ExtractionStrategy for RawPatternStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> ExtractionAttempt {
        match self.pattern.captures(input.raw()) {
            Some(caps) => input.judge(Self::NAME, parse_count(&caps[1]), &caps[0]),
            None => ExtractionAttempt::missed(Self::NAME, None),
        }
    }
}

/// Heading inside the comments card, found through progressively looser selectors.
pub struct StructuredSelectorStrategy {
    label: String,
    tiers: Vec<Selector>,
    container: Option<Selector>,
    count_pattern: Regex,
}

impl StructuredSelectorStrategy {
    pub const NAME: &'static str = "structured-selector";

    pub fn new(label: &str) -> Result<Self, ExtractionSetupError> {
        let any_heading = HEADINGS.join(", ");
        let under_header = HEADER_CONTAINERS
            .iter()
            .flat_map(|container| HEADINGS.iter().map(move |h| format!("{container} {h}")))
            .collect::<Vec<_>>()
            .join(", ");
        let tiers = [
            "div.card-header.bg-white h3",
            under_header.as_str(),
            any_heading.as_str(),
        ]
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .collect();
        Ok(Self {
            label: label.to_string(),
            tiers,
            container: Selector::parse(COMMENT_CONTAINERS).ok(),
            count_pattern: Regex::new(&format!(r"\(\s*({DIGITS})\s*\)"))?,
        })
    }
}

impl StructuredSelectorStrategy {
    /// Outer HTML of the nearest ancestor that looks like the comments block.
    fn enclosing_container(&self, heading: ElementRef<'_>) -> Option<String> {
        let container = self.container.as_ref()?;
        heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| container.matches(element))
            .map(|element| element.html())
    }
}

impl ExtractionStrategy for StructuredSelectorStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> ExtractionAttempt {
        let document = input.document();
        let mut rejected = None;
        for (tier, selector) in self.tiers.iter().enumerate() {
            for heading in document.select(selector) {
                let text = collapse_whitespace(&heading.text().collect::<String>());
                if !text.contains(&self.label) {
                    continue;
                }
                let Some(caps) = self.count_pattern.captures(&text) else {
                    continue;
                };
                let value = parse_count(&caps[1]);
                if input.within_ceiling(value) {
                    probe_debug!("structured match at tier {}: {}", tier, text);
                    return input
                        .judge(Self::NAME, value, &text)
                        .with_header_block(heading.html(), self.enclosing_container(heading));
                }
                rejected.get_or_insert(text);
            }
        }
        match rejected {
            Some(text) => input.judge(Self::NAME, None, &text),
            None => ExtractionAttempt::missed(Self::NAME, None),
        }
    }
}

/// Looser textual patterns over the visible text, tried in order.
pub struct FlexiblePatternStrategy {
    patterns: Vec<Regex>,
}

impl FlexiblePatternStrategy {
    pub const NAME: &'static str = "flexible-pattern";

    pub fn new(label: &str) -> Result<Self, ExtractionSetupError> {
        let label = regex::escape(label);
        let sources = [
            // label, optional separator, number
            format!(r"{label}\s*[:：\-–]?\s*[(\[]?\s*({DIGITS})"),
            // number, unit word
            format!(r"({DIGITS})\s*(?:تعليقات|تعليق|ردود|رد)\b"),
            r"(?i)\b([0-9]+)\s+(?:comments?|replies|reply)\b".to_string(),
            r"(?i)\b(?:comments?|replies)\s*[:(]\s*([0-9]+)".to_string(),
        ];
        let patterns = sources
            .iter()
            .map(|src| Regex::new(src))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }
}

impl ExtractionStrategy for FlexiblePatternStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> ExtractionAttempt {
        let text = input.text();
        let mut rejected = None;
        for pattern in &self.patterns {
            for caps in pattern.captures_iter(text) {
                let value = parse_count(&caps[1]);
                if input.within_ceiling(value) {
                    return input.judge(Self::NAME, value, &caps[0]);
                }
                rejected.get_or_insert_with(|| caps[0].to_string());
            }
        }
        match rejected {
            Some(evidence) => input.judge(Self::NAME, None, &evidence),
            None => ExtractionAttempt::missed(Self::NAME, None),
        }
    }
}

/// Number of rendered comment elements, used when no textual count exists.
pub struct ElementCountStrategy {
    selector_text: String,
    selector: Selector,
}

impl ElementCountStrategy {
    pub const NAME: &'static str = "element-count";

    pub fn new(selector_text: &str) -> Result<Self, ExtractionSetupError> {
        let selector =
            Selector::parse(selector_text).map_err(|err| ExtractionSetupError::InvalidSelector {
                selector: selector_text.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            selector_text: selector_text.to_string(),
            selector,
        })
    }
}

impl ExtractionStrategy for ElementCountStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> ExtractionAttempt {
        let count = input.document().select(&self.selector).count();
        if count == 0 {
            return ExtractionAttempt::missed(Self::NAME, None);
        }
        let evidence = format!("{count} elements matching {}", self.selector_text);
        input.judge(Self::NAME, Some(count as u64), &evidence)
    }
}

/// Count and trail of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub count: Option<u32>,
    pub trail: Vec<ExtractionAttempt>,
}

impl Extraction {
    pub fn winning_strategy(&self) -> Option<&str> {
        self.trail
            .last()
            .filter(|attempt| attempt.matched)
            .map(|attempt| attempt.strategy_name.as_str())
    }
}

pub struct ExtractionChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    max_count: u32,
}

impl ExtractionChain {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>, max_count: u32) -> Self {
        Self {
            strategies,
            max_count,
        }
    }

    /// The four built-in strategies in priority order.
    pub fn from_settings(settings: &ExtractionSettings) -> Result<Self, ExtractionSetupError> {
        if settings.label.trim().is_empty() {
            return Err(ExtractionSetupError::EmptyLabel);
        }
        let label = settings.label.trim();
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(RawPatternStrategy::new(label)?),
            Box::new(StructuredSelectorStrategy::new(label)?),
            Box::new(FlexiblePatternStrategy::new(label)?),
            Box::new(ElementCountStrategy::new(&settings.comment_selector)?),
        ];
        Ok(Self::new(strategies, settings.max_count))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, body: &str) -> Extraction {
        let input = ExtractionInput::new(body, self.max_count);
        let mut trail = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let attempt = strategy.attempt(&input);
            let value = attempt.value.filter(|_| attempt.matched);
            trail.push(attempt);
            if let Some(count) = value {
                probe_info!("strategy {} found {} comments", strategy.name(), count);
                return Extraction {
                    count: Some(count),
                    trail,
                };
            }
            probe_debug!("strategy {} found nothing", strategy.name());
        }
        Extraction { count: None, trail }
    }
}

/// Parses ASCII or Arabic-Indic digits; `None` on overflow.
fn parse_count(digits: &str) -> Option<u64> {
    digits.chars().try_fold(0u64, |acc, ch| {
        let digit = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            '\u{0660}'..='\u{0669}' => ch as u32 - 0x0660,
            '\u{06F0}'..='\u{06F9}' => ch as u32 - 0x06F0,
            _ => return None,
        };
        acc.checked_mul(10)?.checked_add(u64::from(digit))
    })
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        Node::Element(element) => {
            if matches!(element.name(), "script" | "style" | "noscript" | "template") {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
