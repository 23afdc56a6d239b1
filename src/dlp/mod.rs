//! Content inspection for form submissions.
//!
//! - [`patterns`] holds the compiled, ordered rule set ([`patterns::PatternSet`]).
//! - [`scanner`] scans one piece of text against every rule.
//! - [`inspect`] runs the scanner over every decoded form field and
//!   aggregates the results into an [`InspectionVerdict`].
//!
//! The inspection core is pure. Diagnostics flow through a [`ScanObserver`]
//! supplied by the caller; [`TracingObserver`] forwards them to `tracing`.

pub mod inspect;
pub mod patterns;
pub mod scanner;

use std::fmt;

use serde::Serialize;

/// A single match of one rule inside a scanned text.
///
/// `start` and `end` are byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub rule_id: String,
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
}

/// One piece of a [`Highlight`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Span {
    /// Text outside any match.
    Plain(String),
    /// Text matched by a rule.
    Flagged(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(t) | Span::Flagged(t) => t,
        }
    }
}

/// The scanned text split into plain and flagged spans.
///
/// Rendering (HTML, terminal) is left to the caller. Concatenating the span
/// texts always reproduces the scanned text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Highlight {
    spans: Vec<Span>,
}

impl Highlight {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The original text with all markers removed.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }

    /// Render with custom markers around each flagged span.
    pub fn render_with(&self, open: &str, close: &str) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                Span::Plain(t) => out.push_str(t),
                Span::Flagged(t) => {
                    out.push_str(open);
                    out.push_str(t);
                    out.push_str(close);
                }
            }
        }
        out
    }
}

impl fmt::Display for Highlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(">>", "<<"))
    }
}

/// All matches of one rule plus the highlighted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub rule_id: String,
    pub matches: Vec<Match>,
    pub highlight: Highlight,
}

/// Outcome of scanning one text against a [`patterns::PatternSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// `true` iff `hits` is empty.
    pub clean: bool,
    /// One entry per matching rule, in rule order.
    pub hits: Vec<RuleHit>,
}

/// Scan outcome for one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field_name: String,
    pub clean: bool,
    pub violations: Vec<RuleHit>,
}

/// Final decision for one request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionVerdict {
    /// `true` iff `reports` is empty.
    pub clean: bool,
    /// Reports for flagged fields only.
    pub reports: Vec<FieldReport>,
}

/// Receives diagnostics from the inspection core.
///
/// All methods default to no-ops so tests can pass [`NoopObserver`].
pub trait ScanObserver: Send + Sync {
    fn rule_started(&self, _rule_id: &str) {}
    fn rule_matched(&self, _rule_id: &str, _matches: &[Match]) {}
    fn field_inspected(&self, _field_name: &str, _clean: bool) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Observer that logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn rule_started(&self, rule_id: &str) {
        tracing::debug!("Trying rule '{}'", rule_id);
    }

    fn rule_matched(&self, rule_id: &str, matches: &[Match]) {
        let texts: Vec<&str> = matches.iter().map(|m| m.matched_text.as_str()).collect();
        tracing::debug!("Rule '{}' matched {:?}", rule_id, texts);
    }

    fn field_inspected(&self, field_name: &str, clean: bool) {
        if clean {
            tracing::debug!("Field '{}' is clean", field_name);
        } else {
            tracing::info!("Field '{}' violates policy", field_name);
        }
    }
}
