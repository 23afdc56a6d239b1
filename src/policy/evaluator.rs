use super::config::{Action, PolicyConfig};

/// Reason shown on the violation page for a deny-listed URL.
pub const DENY_LIST_REASON: &str = "This domain is on the deny list.";

/// Result of a policy evaluation, including the action and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
    pub action: Action,
    pub reason: String,
    pub matched_entry: Option<String>,
}

/// Evaluate a GET target URL against the deny list.
///
/// An entry matches when it occurs anywhere in the URL, so `"reddit.com"`
/// also blocks `old.reddit.com` and `http://example.com/?r=reddit.com`.
pub fn evaluate_url(url: &str, config: &PolicyConfig) -> EvalResult {
    match denied_entry(url, &config.deny_list) {
        Some(entry) => EvalResult {
            action: Action::Deny,
            reason: DENY_LIST_REASON.to_string(),
            matched_entry: Some(entry.to_string()),
        },
        None => EvalResult {
            action: Action::Allow,
            reason: "Not on the deny list".to_string(),
            matched_entry: None,
        },
    }
}

/// First deny-list entry contained in `url`.
pub fn denied_entry<'a>(url: &str, deny_list: &'a [String]) -> Option<&'a str> {
    deny_list
        .iter()
        .map(String::as_str)
        .find(|entry| !entry.is_empty() && url.contains(entry))
}
