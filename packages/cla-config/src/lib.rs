//! Layered configuration model for the command line assistant daemon and client.
//!
//! Defaults -> `config.toml` (first hit under `XDG_CONFIG_DIRS`, falling back
//! to `/etc/xdg`) -> `CLA__SECTION__FIELD` environment variables, matching the
//! teacher's figment layering in spirit (`crab_city::config::load_config`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

mod error;
pub use error::ConfigError;

const CONFIG_FILE_DEFINITION: (&str, &str) = ("command_line_assistant", "config.toml");
const ENV_PREFIX: &str = "CLA__";

/// Top-level frozen configuration record, composed of the four sub-schemas
/// named in spec.md §4.12.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub output: OutputSchema,
    #[serde(default)]
    pub history: HistorySchema,
    #[serde(default)]
    pub backend: BackendSchema,
    #[serde(default)]
    pub logging: LoggingSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSchema {
    pub enforce_script: bool,
    pub file: PathBuf,
    pub prompt_separator: String,
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self {
            enforce_script: false,
            file: PathBuf::from("/tmp/command-line-assistant_output.txt"),
            prompt_separator: "$".to_string(),
        }
    }
}

/// `[history.database]` / `[database]` shape. `type` selects the engine; the
/// reference daemon only ever opens `sqlite`, but the schema stays
/// engine-agnostic per spec.md §4.1 ("the choice is configuration-driven").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSchema {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub host: Option<String>,
    pub database: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connection_string: Option<String>,
    pub pool_size: u32,
    pub pool_timeout_ms: u64,
}

impl Default for DatabaseSchema {
    fn default() -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            host: None,
            database: Some("command-line-assistant".to_string()),
            port: None,
            user: None,
            password: None,
            connection_string: None,
            pool_size: 5,
            pool_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    Mysql,
    Postgresql,
}

impl DatabaseSchema {
    /// Normalize defaulted ports and an expanded connection string/path, the
    /// Rust analogue of the Python schema's `__post_init__`.
    pub fn normalize(mut self) -> Result<Self, ConfigError> {
        if let Some(cs) = &self.connection_string {
            self.connection_string = Some(expand_home(cs));
        }
        match self.kind {
            DatabaseKind::Sqlite => {
                if self.connection_string.is_none() {
                    let db = self.database.clone().unwrap_or_default();
                    self.connection_string = Some(format!("sqlite://{db}"));
                }
            }
            DatabaseKind::Mysql => {
                if self.port.is_none() {
                    self.port = Some(3306);
                }
            }
            DatabaseKind::Postgresql => {
                if self.port.is_none() {
                    self.port = Some(5432);
                }
            }
        }
        Ok(self)
    }

    /// Build the sqlx connection URL for this schema.
    pub fn connection_url(&self) -> String {
        match self.kind {
            DatabaseKind::Sqlite => {
                let cs = self.connection_string.as_deref().unwrap_or("sqlite::memory:");
                if cs.starts_with("sqlite:") {
                    format!("{cs}?mode=rwc")
                } else {
                    format!("sqlite://{cs}?mode=rwc")
                }
            }
            DatabaseKind::Mysql => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user.as_deref().unwrap_or(""),
                self.password.as_deref().unwrap_or(""),
                self.host.as_deref().unwrap_or("127.0.0.1"),
                self.port.unwrap_or(3306),
                self.database.as_deref().unwrap_or(""),
            ),
            DatabaseKind::Postgresql => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user.as_deref().unwrap_or(""),
                self.password.as_deref().unwrap_or(""),
                self.host.as_deref().unwrap_or("127.0.0.1"),
                self.port.unwrap_or(5432),
                self.database.as_deref().unwrap_or(""),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySchema {
    pub enabled: bool,
    pub database: DatabaseSchema,
}

impl Default for HistorySchema {
    fn default() -> Self {
        Self {
            enabled: true,
            database: DatabaseSchema::default(),
        }
    }
}

/// `[backend]` section — C2's HTTP submitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSchema {
    pub endpoint: String,
    pub verify_ssl: bool,
    pub timeout_secs: u64,
}

impl Default for BackendSchema {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.redhat.com/api/lightspeed".to_string(),
            verify_ssl: true,
            timeout_secs: 30,
        }
    }
}

/// Per-user logging opt-out/opt-in, keyed by effective UID (as a string,
/// since the config file is TOML and TOML table keys are strings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserLogPolicy {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSchema {
    pub level: String,
    pub responses: bool,
    pub question: bool,
    pub users: HashMap<String, UserLogPolicy>,
    /// Resolved Open Question #3 (DESIGN.md): whether audit records carry
    /// the question/response bodies verbatim, or only their lengths.
    pub audit_verbose: bool,
}

impl Default for LoggingSchema {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            responses: true,
            question: true,
            users: HashMap::new(),
            audit_verbose: false,
        }
    }
}

impl LoggingSchema {
    const ALLOWED_LEVELS: &'static [&'static str] =
        &["CRITICAL", "ERROR", "WARNING", "INFO", "DEBUG", "NOTSET"];

    pub fn normalize(mut self) -> Result<Self, ConfigError> {
        let upper = self.level.to_uppercase();
        if !Self::ALLOWED_LEVELS.contains(&upper.as_str()) {
            return Err(ConfigError::InvalidLoggingLevel(self.level));
        }
        self.level = upper;
        Ok(self)
    }

    /// Per spec.md §4.9's allow-list check: does this user's effective uid
    /// have logging enabled? Absent entries default to enabled.
    pub fn enabled_for_user(&self, effective_uid: u32) -> bool {
        self.users
            .get(&effective_uid.to_string())
            .map(|p| p.enabled)
            .unwrap_or(true)
    }
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// Locate `command_line_assistant/config.toml` under `XDG_CONFIG_DIRS`
/// (colon-separated, first hit wins), falling back to `/etc/xdg`.
pub fn find_config_file() -> Option<PathBuf> {
    let dirs = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_string());
    for dir in dirs.split(':').filter(|d| !d.is_empty()) {
        let candidate = Path::new(dir)
            .join(CONFIG_FILE_DEFINITION.0)
            .join(CONFIG_FILE_DEFINITION.1);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Load and normalize the full configuration, layering defaults, an optional
/// TOML file, and `CLA__`-prefixed environment variables.
pub fn load_config(config_path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    let path = config_path.map(Path::to_path_buf).or_else(find_config_file);
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let mut config: Config = figment.extract()?;
    config.history.database = config.history.database.normalize()?;
    config.logging = config.logging.normalize()?;
    if config.output.file.to_string_lossy().starts_with("~/") {
        config.output.file = PathBuf::from(expand_home(&config.output.file.to_string_lossy()));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.backend.timeout_secs, 30);
        assert!(config.history.enabled);
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn database_defaults_sqlite_connection_string() {
        let db = DatabaseSchema {
            database: Some("chats".to_string()),
            ..DatabaseSchema::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(db.connection_string.as_deref(), Some("sqlite://chats"));
    }

    #[test]
    fn database_defaults_mysql_port() {
        let db = DatabaseSchema {
            kind: DatabaseKind::Mysql,
            ..DatabaseSchema::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(db.port, Some(3306));
    }

    #[test]
    fn database_defaults_postgresql_port() {
        let db = DatabaseSchema {
            kind: DatabaseKind::Postgresql,
            ..DatabaseSchema::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(db.port, Some(5432));
    }

    #[test]
    fn logging_level_rejects_unknown_values() {
        let logging = LoggingSchema {
            level: "TRACE".to_string(),
            ..LoggingSchema::default()
        };
        assert!(logging.normalize().is_err());
    }

    #[test]
    fn logging_level_uppercases_valid_values() {
        let logging = LoggingSchema {
            level: "debug".to_string(),
            ..LoggingSchema::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(logging.level, "DEBUG");
    }

    #[test]
    fn user_log_policy_defaults_to_enabled() {
        let logging = LoggingSchema::default();
        assert!(logging.enabled_for_user(1000));
    }

    #[test]
    fn user_log_policy_honors_explicit_opt_out() {
        let mut logging = LoggingSchema::default();
        logging
            .users
            .insert("1000".to_string(), UserLogPolicy { enabled: false });
        assert!(!logging.enabled_for_user(1000));
        assert!(logging.enabled_for_user(1001));
    }

    #[test]
    fn load_config_from_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [backend]
            endpoint = "https://example.test/api"
            verify_ssl = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.backend.endpoint, "https://example.test/api");
        assert!(!config.backend.verify_ssl);
        assert_eq!(config.logging.level, "DEBUG");
    }

    #[test]
    fn load_config_without_file_uses_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.backend.endpoint, BackendSchema::default().endpoint);
    }
}
