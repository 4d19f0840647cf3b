use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::BotforgeConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "botforge.toml",
    "botforge.yaml",
    "botforge.yml",
    "botforge.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<BotforgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./botforge.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/botforge/botforge.{toml,yaml,yml,json}` (user-global)
///
/// Returns defaults (plus env overrides) if no config file is found.
pub fn discover_and_load() -> BotforgeConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    BotforgeConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            BotforgeConfig::default()
        },
    };
    apply_env(&mut config);
    config
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/botforge/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("botforge")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BotforgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Apply environment variable overrides (`TELEGRAM_API_ID`,
/// `TELEGRAM_API_HASH`, `HOST`, `PORT`, `LARAVEL_SECRET_KEY`,
/// `SESSION_PATH`).
pub fn apply_env(config: &mut BotforgeConfig) {
    apply_env_from(config, |name| std::env::var(name).ok());
}

fn apply_env_from(config: &mut BotforgeConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(id) = get("TELEGRAM_API_ID").and_then(|v| v.parse().ok()) {
        config.telegram.api_id = id;
    }
    if let Some(hash) = get("TELEGRAM_API_HASH").filter(|v| !v.is_empty()) {
        config.telegram.api_hash = hash;
    }
    if let Some(bind) = get("HOST").filter(|v| !v.is_empty()) {
        config.server.bind = bind;
    }
    if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
        config.server.port = port;
    }
    if let Some(key) = get("LARAVEL_SECRET_KEY").filter(|v| !v.is_empty()) {
        config.auth.api_key = Some(key);
    }
    if let Some(dir) = get("SESSION_PATH").filter(|v| !v.is_empty()) {
        config.sessions.dir = PathBuf::from(dir);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botforge.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[server]\nport = 9100").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind, "0.0.0.0");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botforge.ini");
        std::fs::write(&path, "nope").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = BotforgeConfig::default();
        apply_env_from(&mut config, |name| match name {
            "TELEGRAM_API_ID" => Some("424242".into()),
            "TELEGRAM_API_HASH" => Some("deadbeef".into()),
            "PORT" => Some("9000".into()),
            "LARAVEL_SECRET_KEY" => Some("shhh".into()),
            "SESSION_PATH" => Some("/tmp/tg-sessions".into()),
            _ => None,
        });
        assert_eq!(config.telegram.api_id, 424242);
        assert_eq!(config.telegram.api_hash, "deadbeef");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.api_key(), Some("shhh"));
        assert_eq!(config.sessions.dir, PathBuf::from("/tmp/tg-sessions"));
    }

    #[test]
    fn unparseable_env_values_ignored() {
        let mut config = BotforgeConfig::default();
        apply_env_from(&mut config, |name| {
            (name == "PORT").then(|| "not-a-port".into())
        });
        assert_eq!(config.server.port, 8001);
    }
}
