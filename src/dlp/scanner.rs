//! Regex-based content scanner.
//!
//! Every rule is run over the whole text in configured order. Matches within
//! a rule are leftmost-first and non-overlapping, reported left to right.

use super::patterns::{PatternSet, Rule};
use super::{Highlight, Match, RuleHit, ScanObserver, ScanResult, Span};

/// Scan `text` against every rule in `rules`.
pub fn scan(text: &str, rules: &PatternSet, observer: &dyn ScanObserver) -> ScanResult {
    let mut hits = Vec::new();
    for rule in rules.iter() {
        observer.rule_started(rule.id());
        let matches = find_matches(text, rule);
        if matches.is_empty() {
            continue;
        }
        observer.rule_matched(rule.id(), &matches);
        hits.push(RuleHit {
            rule_id: rule.id().to_string(),
            highlight: highlight(text, &matches),
            matches,
        });
    }
    ScanResult {
        clean: hits.is_empty(),
        hits,
    }
}

fn find_matches(text: &str, rule: &Rule) -> Vec<Match> {
    rule.regex()
        .find_iter(text)
        .map(|m| Match {
            rule_id: rule.id().to_string(),
            start: m.start(),
            end: m.end(),
            matched_text: m.as_str().to_string(),
        })
        .collect()
}

/// Split `text` into plain and flagged spans. `matches` must be sorted and
/// non-overlapping.
pub fn highlight(text: &str, matches: &[Match]) -> Highlight {
    let mut spans = Vec::with_capacity(matches.len() * 2 + 1);
    let mut prev_end = 0;
    for m in matches {
        if m.start > prev_end {
            spans.push(Span::Plain(text[prev_end..m.start].to_string()));
        }
        spans.push(Span::Flagged(m.matched_text.clone()));
        prev_end = m.end;
    }
    if prev_end < text.len() {
        spans.push(Span::Plain(text[prev_end..].to_string()));
    }
    Highlight::new(spans)
}
