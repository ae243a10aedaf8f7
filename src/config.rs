use std::env;
use std::time::Duration;

use crate::relay::executor::{RelayOptions, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS};

pub struct Config {
    pub port: u16,
    pub timeout_ms: u64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            timeout_ms: lookup("RELAY_TIMEOUT_MS")
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            follow_redirects: lookup("RELAY_FOLLOW_REDIRECTS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            max_redirects: lookup("RELAY_MAX_REDIRECTS")
                .and_then(|m| m.parse().ok())
                .unwrap_or(DEFAULT_MAX_REDIRECTS),
        }
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.timeout_ms, 30000);
        assert!(!config.follow_redirects);
        assert_eq!(config.max_redirects, 20);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("RELAY_TIMEOUT_MS", "5000"),
            ("RELAY_FOLLOW_REDIRECTS", "true"),
            ("RELAY_MAX_REDIRECTS", "3"),
        ]);
        let options = config.relay_options();
        assert_eq!(config.port, 8080);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.follow_redirects);
        assert_eq!(options.max_redirects, 3);
    }

    #[test]
    fn test_garbage_falls_back() {
        let config = config_from(&[
            ("PORT", "eighty"),
            ("RELAY_TIMEOUT_MS", "0"),
            ("RELAY_FOLLOW_REDIRECTS", "nope"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.timeout_ms, 30000);
        assert!(!config.follow_redirects);
    }
}
