use vellum_core::purge::{PurgePolicy, DEFAULT_PURGE_BATCH_SIZE, MAX_PURGE_BATCH_SIZE};

/// Default number of attempts to allocate a version number.
pub const DEFAULT_VERSION_ALLOC_RETRIES: u32 = 3;

/// Upper bound for the configured allocation attempts.
pub const MAX_VERSION_ALLOC_RETRIES: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Contents processed per purge batch (default: `100`).
    pub purge_batch_size: i64,
    /// Attempts to allocate a version number before reporting a conflict
    /// (default: `3`).
    pub version_alloc_retries: u32,
    /// Retention knobs for purges.
    pub purge_policy: PurgePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            purge_batch_size: DEFAULT_PURGE_BATCH_SIZE,
            version_alloc_retries: DEFAULT_VERSION_ALLOC_RETRIES,
            purge_policy: PurgePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `PURGE_BATCH_SIZE`           | `100`   |
    /// | `VERSION_ALLOC_RETRIES`      | `3`     |
    /// | `PURGE_KEEP_INITIAL_VERSION` | `false` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let purge_batch_size = match lookup("PURGE_BATCH_SIZE") {
            Some(raw) => parse_in_range("PURGE_BATCH_SIZE", &raw, 1, MAX_PURGE_BATCH_SIZE)?,
            None => defaults.purge_batch_size,
        };

        let version_alloc_retries = match lookup("VERSION_ALLOC_RETRIES") {
            Some(raw) => parse_in_range(
                "VERSION_ALLOC_RETRIES",
                &raw,
                1,
                i64::from(MAX_VERSION_ALLOC_RETRIES),
            )? as u32,
            None => defaults.version_alloc_retries,
        };

        let keep_initial_version = match lookup("PURGE_KEEP_INITIAL_VERSION") {
            Some(raw) => parse_bool("PURGE_KEEP_INITIAL_VERSION", &raw)?,
            None => defaults.purge_policy.keep_initial_version,
        };

        Ok(Self {
            purge_batch_size,
            version_alloc_retries,
            purge_policy: PurgePolicy {
                keep_initial_version,
            },
        })
    }
}

fn parse_in_range(var: &'static str, raw: &str, min: i64, max: i64) -> Result<i64, ConfigError> {
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("expected an integer, got '{raw}'"),
    })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("must be between {min} and {max}, got {value}"),
        });
    }
    Ok(value)
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{raw}'"),
        }),
    }
}
