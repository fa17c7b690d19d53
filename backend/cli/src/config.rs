use std::path::PathBuf;

use explica_client::state_dir;
use explica_gateway::DEFAULT_MAX_BODY_BYTES;
use explica_providers::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// ExplicaAí runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// AI gateway API key; the functions answer 500 without it
    pub ai_api_key: Option<String>,
    /// OpenAI-compatible AI gateway base URL
    pub ai_base_url: String,
    /// Vision model used for analysis and translation
    pub ai_model: String,
    /// Largest request body the functions accept, in bytes
    pub max_body_bytes: usize,
    /// Functions root the CLI session talks to
    pub functions_url: String,
    /// Publishable key sent as a bearer token to the functions
    pub publishable_key: Option<String>,
    /// Directory holding the name store
    pub state_dir: PathBuf,
    /// Directory for rolling JSON logs
    pub log_dir: PathBuf,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("EXPLICA_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8787);
        Self {
            bind_address: lookup("EXPLICA_BIND").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            ai_api_key: lookup("EXPLICA_AI_API_KEY").filter(|k| !k.is_empty()),
            ai_base_url: lookup("EXPLICA_AI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ai_model: lookup("EXPLICA_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_body_bytes: lookup("EXPLICA_MAX_BODY_BYTES")
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            functions_url: lookup("EXPLICA_FUNCTIONS_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}/functions/v1")),
            publishable_key: lookup("EXPLICA_PUBLISHABLE_KEY").filter(|k| !k.is_empty()),
            state_dir: lookup("EXPLICA_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(state_dir),
            log_dir: lookup("EXPLICA_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_with(&[]);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 8787);
        assert_eq!(config.ai_api_key, None);
        assert_eq!(config.ai_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.ai_model, "google/gemini-2.5-flash");
        assert_eq!(config.functions_url, "http://localhost:8787/functions/v1");
        assert_eq!(config.max_body_bytes, 20 * 1024 * 1024);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn functions_url_follows_port() {
        let config = config_with(&[("EXPLICA_PORT", "9000")]);
        assert_eq!(config.functions_url, "http://localhost:9000/functions/v1");
    }

    #[test]
    fn invalid_port_falls_back_and_empty_key_is_unset() {
        let config = config_with(&[
            ("EXPLICA_PORT", "not-a-port"),
            ("EXPLICA_AI_API_KEY", ""),
            ("EXPLICA_STATE_DIR", "/tmp/explica"),
            ("EXPLICA_MAX_BODY_BYTES", "1048576"),
        ]);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.port, 8787);
        assert_eq!(config.ai_api_key, None);
        assert_eq!(config.state_dir, PathBuf::from("/tmp/explica"));
    }
}
