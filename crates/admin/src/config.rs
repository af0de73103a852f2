use vellum_db::DEFAULT_MAX_CONNECTIONS;
use vellum_engine::config::{ConfigError, EngineConfig};

/// Output format for log lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Admin configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Connection pool size (default: `20`).
    pub max_connections: u32,
    /// Log line format (default: text).
    pub log_format: LogFormat,
    pub engine: EngineConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default |
    /// |----------------------|---------|
    /// | `DB_MAX_CONNECTIONS` | `20`    |
    /// | `LOG_FORMAT`         | `text`  |
    ///
    /// Engine variables are documented on [`EngineConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DB_MAX_CONNECTIONS",
                        reason: format!("expected a positive integer, got '{raw}'"),
                    })
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("expected 'text' or 'json', got '{other}'"),
                })
            }
        };

        Ok(Self {
            max_connections,
            log_format,
            engine: EngineConfig::from_lookup(&lookup)?,
        })
    }
}
