use thiserror::Error;

/// Unified error type for the dlpgate library.
#[derive(Debug, Error)]
pub enum DlpGateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Environment variable not set: {0}")]
    ConfigEnvVar(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern for rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate rule id: {0}")]
    DuplicateRule(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize, declared: usize },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out")]
    UpstreamTimeout,

    #[error("Proxy error: {0}")]
    Proxy(String),
}

pub type Result<T> = std::result::Result<T, DlpGateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DlpGateError = io_err.into();
        assert!(matches!(err, DlpGateError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn invalid_pattern_names_the_rule() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err = DlpGateError::InvalidPattern {
            rule: "Broken".to_string(),
            source: regex_err,
        };
        assert!(err.to_string().starts_with("Invalid pattern for rule 'Broken'"));
    }

    #[test]
    fn body_too_large_displays_sizes() {
        let err = DlpGateError::BodyTooLarge {
            limit: 10,
            declared: 20,
        };
        assert_eq!(
            err.to_string(),
            "Request body of 20 bytes exceeds the 10 byte limit"
        );
    }

    #[test]
    fn config_parse_error_converts() {
        let toml_err = toml::from_str::<toml::Value>("[invalid").unwrap_err();
        let err: DlpGateError = toml_err.into();
        assert!(matches!(err, DlpGateError::ConfigParse(_)));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DlpGateError>();
    }
}
