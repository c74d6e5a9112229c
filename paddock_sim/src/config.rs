//! Loading the weekend configuration for a simulation run.

use paddock_core::weekend::WeekendConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// Reads a JSON weekend config. Missing fields keep their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WeekendConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    let config: WeekendConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: display.clone(),
        source,
    })?;
    if !(0.0..=1.0).contains(&config.bot_upgrade_chance) {
        return Err(ConfigError::Invalid {
            path: display,
            reason: format!("bot_upgrade_chance {} outside [0, 1]", config.bot_upgrade_chance),
        });
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("paddock-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let path = write_temp("partial", r#"{ "post_race_delay_secs": 60, "prize": { "base": 1000 } }"#);
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.post_race_delay_secs, 60);
        assert_eq!(config.prize.base, 1000);
        assert_eq!(config.prize.per_point, 150_000);
        assert_eq!(config.league_stagger_secs, 300);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/paddock.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bad_json_and_bad_chance() {
        let path = write_temp("bad", "{ not json");
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
        std::fs::remove_file(&path).ok();

        let path = write_temp("chance", r#"{ "bot_upgrade_chance": 1.5 }"#);
        assert!(matches!(load_config(&path), Err(ConfigError::Invalid { .. })));
        std::fs::remove_file(&path).ok();
    }
}
