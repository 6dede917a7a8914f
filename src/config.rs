//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::form::Language;

/// Engine configuration, read from `FORM_FLOW_*` environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where the active-session snapshot is written.
    pub sessions_path: PathBuf,
    /// Language a fresh session starts in until the user picks one.
    pub default_language: Language,
    /// Optional JSON file with the events offered by the local runner.
    pub events_path: Option<PathBuf>,
    /// Port for the status routes. Disabled when unset.
    pub http_port: Option<u16>,
    /// Prefix for partner invitation links; the registration id is appended.
    pub invite_base: Option<String>,
    /// User id the CLI runner answers as.
    pub cli_user_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sessions_path: PathBuf::from("./data/active_forms.json"),
            default_language: Language::He,
            events_path: None,
            http_port: None,
            invite_base: None,
            cli_user_id: "local-user".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or empty keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("FORM_FLOW_SESSIONS_PATH") {
            config.sessions_path = PathBuf::from(path);
        }
        if let Some(lang) = get("FORM_FLOW_LANGUAGE") {
            config.default_language =
                lang.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "FORM_FLOW_LANGUAGE".into(),
                    message: format!("expected 'he' or 'en', got '{lang}'"),
                })?;
        }
        config.events_path = get("FORM_FLOW_EVENTS_PATH").map(PathBuf::from);
        if let Some(port) = get("FORM_FLOW_HTTP_PORT") {
            let parsed = port.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "FORM_FLOW_HTTP_PORT".into(),
                message: e.to_string(),
            })?;
            config.http_port = Some(parsed);
        }
        config.invite_base = get("FORM_FLOW_INVITE_BASE");
        if let Some(user) = get("FORM_FLOW_USER_ID") {
            config.cli_user_id = user;
        }

        Ok(config)
    }
}
