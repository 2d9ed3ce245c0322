//! Process configuration from the environment

use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2025-06-03";
pub const DEFAULT_AGENT_NAME: &str = "Survey Assistant";
pub const DEFAULT_READY_NOTICE_MS: u64 = 500;

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub realtime_model: String,
    pub agent_name: String,
    pub ready_notice_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            ready_notice_delay: Duration::from_millis(DEFAULT_READY_NOTICE_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset, empty or unparsable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = parse_or(get("SURVEY_PORT"), "SURVEY_PORT", defaults.port);
        let ready_ms = parse_or(
            get("SURVEY_READY_NOTICE_MS"),
            "SURVEY_READY_NOTICE_MS",
            DEFAULT_READY_NOTICE_MS,
        );

        Self {
            port,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            realtime_model: get("SURVEY_REALTIME_MODEL").unwrap_or(defaults.realtime_model),
            agent_name: get("SURVEY_AGENT_NAME").unwrap_or(defaults.agent_name),
            ready_notice_delay: Duration::from_millis(ready_ms),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("realtime_model", &self.realtime_model)
            .field("agent_name", &self.agent_name)
            .field("ready_notice_delay", &self.ready_notice_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openai_base_url, "https://api.openai.com");
        assert_eq!(config.realtime_model, "gpt-4o-realtime-preview-2025-06-03");
        assert_eq!(config.agent_name, "Survey Assistant");
        assert_eq!(config.ready_notice_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = from_map(&[
            ("SURVEY_PORT", "not-a-port"),
            ("SURVEY_READY_NOTICE_MS", "50"),
            ("OPENAI_API_KEY", "sk-test"),
            ("SURVEY_AGENT_NAME", "  "),
        ]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.ready_notice_delay, Duration::from_millis(50));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.agent_name, "Survey Assistant");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = from_map(&[("OPENAI_API_KEY", "sk-very-secret")]);
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
