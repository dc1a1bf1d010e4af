use serde::Deserialize;
use std::{env, fs, path::Path};
use thiserror::Error;

const SETTINGS_FILENAME: &str = "settings.json";
/// Points at a settings file other than `./settings.json`.
const SETTINGS_PATH_VAR: &str = "TODO_CHAT_SETTINGS";
/// Overrides `jwt_secret` so it can stay out of the file.
const JWT_SECRET_VAR: &str = "JWT_SECRET";
/// One year.
const MAX_JWT_EXPIRATION_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub tcp_socket_binding: String,
    pub tcp_socket_port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_in_minutes: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_jwt_expiration() -> u64 {
    7 * 24 * 60
}

fn default_log_filter() -> String {
    "todo_chat_server=info".to_string()
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("jwt_secret must not be empty")]
    EmptySecret,
    #[error(
        "jwt_expiration_in_minutes must be between 1 and {max}, got {0}",
        max = MAX_JWT_EXPIRATION_MINUTES
    )]
    Expiration(u64),
}

impl Settings {
    /// Load from `$TODO_CHAT_SETTINGS` or `./settings.json`, then apply
    /// environment overrides.
    pub fn load() -> Result<Settings, SettingsError> {
        let path = env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| SETTINGS_FILENAME.to_string());
        let mut settings = Settings::from_path(&path)?;
        if let Ok(secret) = env::var(JWT_SECRET_VAR) {
            settings.jwt_secret = secret;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Settings::from_json(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn from_json(content: &str) -> Result<Settings, serde_json::Error> {
        serde_json::from_str(content)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(SettingsError::EmptySecret);
        }
        if !(1..=MAX_JWT_EXPIRATION_MINUTES).contains(&self.jwt_expiration_in_minutes) {
            return Err(SettingsError::Expiration(self.jwt_expiration_in_minutes));
        }
        Ok(())
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.tcp_socket_binding, self.tcp_socket_port)
    }
}
