//! Ordered, compiled DLP rule set.
//!
//! Rules come from the `[[rules]]` array of the configuration file and are
//! compiled once at startup. Compilation is all-or-nothing: a single broken
//! pattern or a repeated rule id rejects the whole set.
//!
//! Matching is case-insensitive unless a rule sets `case_sensitive = true`.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::{DlpGateError, Result};
use crate::policy::config::RuleConfig;

/// A named, compiled pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    regex: Regex,
    case_sensitive: bool,
}

impl Rule {
    /// Compile a single rule.
    pub fn new(id: &str, pattern: &str, case_sensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| DlpGateError::InvalidPattern {
                rule: id.to_string(),
                source: e,
            })?;
        Ok(Self {
            id: id.to_string(),
            regex,
            case_sensitive,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

/// Rules in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    rules: Vec<Rule>,
}

impl PatternSet {
    /// Compile every configured rule, keeping configuration order.
    pub fn compile(configs: &[RuleConfig]) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(configs.len());
        for cfg in configs {
            if !seen.insert(cfg.id.as_str()) {
                return Err(DlpGateError::DuplicateRule(cfg.id.clone()));
            }
            rules.push(Rule::new(&cfg.id, &cfg.pattern, cfg.case_sensitive)?);
        }
        Ok(Self { rules })
    }

    /// Build a set from already compiled rules. Fails on duplicate ids.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(DlpGateError::DuplicateRule(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(id: &str, pattern: &str, case_sensitive: bool) -> RuleConfig {
        RuleConfig {
            id: id.to_string(),
            pattern: pattern.to_string(),
            case_sensitive,
        }
    }

    #[test]
    fn compile_keeps_configured_order() {
        let set = PatternSet::compile(&[
            cfg("b", "bbb", false),
            cfg("a", "aaa", false),
            cfg("c", "ccc", true),
        ])
        .unwrap();
        let ids: Vec<&str> = set.iter().map(Rule::id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn invalid_pattern_fails_fast() {
        let err = PatternSet::compile(&[cfg("ok", "fine", false), cfg("broken", "(", false)])
            .unwrap_err();
        match err {
            DlpGateError::InvalidPattern { rule, .. } => assert_eq!(rule, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = PatternSet::compile(&[cfg("same", "a", false), cfg("same", "b", false)])
            .unwrap_err();
        assert!(matches!(err, DlpGateError::DuplicateRule(id) if id == "same"));
    }

    #[test]
    fn case_insensitive_by_default() {
        let rule = Rule::new("post", "post", false).unwrap();
        assert!(rule.regex().is_match("Please POST this."));
        assert!(!rule.case_sensitive());
    }

    #[test]
    fn case_sensitive_override() {
        let rule = Rule::new("post", "post", true).unwrap();
        assert!(!rule.regex().is_match("Please POST this."));
        assert!(rule.regex().is_match("a post"));
    }

    #[test]
    fn lookup_by_id() {
        let set = PatternSet::compile(&[cfg("Test Pattern", "post", false)]).unwrap();
        assert_eq!(set.get("Test Pattern").unwrap().pattern(), "post");
        assert!(set.get("missing").is_none());
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }

    #[test]
    fn from_rules_rejects_duplicates() {
        let a = Rule::new("x", "a", false).unwrap();
        let b = Rule::new("x", "b", false).unwrap();
        assert!(PatternSet::from_rules(vec![a, b]).is_err());
    }
}
