use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotforgeConfig {
    pub telegram: TelegramConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub sessions: SessionsConfig,
}

/// Telegram API credentials, issued at <https://my.telegram.org>.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_id: i32,
    pub api_hash: String,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8001,
        }
    }
}

/// Shared-secret auth for the REST surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret the caller must present in `X-Api-Key`.
    pub api_key: Option<String>,

    /// Explicit opt-in to serve without any API key. Startup refuses to run
    /// unauthenticated unless this is set.
    pub allow_unauthenticated: bool,
}

impl AuthConfig {
    /// The configured key, treating an empty string as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Where per-session credential files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub dir: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./sessions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = BotforgeConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.sessions.dir, PathBuf::from("./sessions"));
        assert!(config.auth.api_key().is_none());
        assert!(!config.auth.allow_unauthenticated);
    }

    #[test]
    fn empty_api_key_counts_as_unset() {
        let auth = AuthConfig {
            api_key: Some(String::new()),
            allow_unauthenticated: false,
        };
        assert!(auth.api_key().is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: BotforgeConfig =
            toml::from_str("[telegram]\napi_id = 12345\napi_hash = \"abc\"\n")
                .expect("valid toml");
        assert_eq!(config.telegram.api_id, 12345);
        assert_eq!(config.server.port, 8001);
    }
}
