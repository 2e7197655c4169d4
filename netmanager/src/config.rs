//! Configuration for the Network Manager.
//!
//! Configuration can be built in code with the builder methods or loaded
//! from the `[network]` section of an INI file:
//!
//! ```ini
//! [network]
//! timeout_secs = 30
//! max_concurrent_operations = 4
//! user_agent = my-app/1.0
//! max_body_bytes = 268435456
//! progress_step = 0.01
//! ```
//!
//! Keys that are absent keep their default value; unknown keys are ignored.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use crate::error::ConfigError;
use crate::progress::DEFAULT_PROGRESS_STEP;

/// INI section holding network settings.
pub const CONFIG_SECTION: &str = "network";

/// Default maximum response body size (256 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Configuration for the Network Manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Timeout for a whole operation, from send to the last body byte.
    ///
    /// A request can override it with [`Request::with_timeout`](crate::Request::with_timeout).
    pub timeout: Duration,

    /// Maximum number of operations running at the same time.
    ///
    /// Further operations wait for a slot before sending.
    pub max_concurrent_operations: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Bodies larger than this fail with `TooLarge`.
    pub max_body_bytes: u64,

    /// Minimum change between two progress notifications.
    pub progress_step: f64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_concurrent_operations: 4,
            user_agent: format!("netmanager/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            progress_step: DEFAULT_PROGRESS_STEP,
        }
    }
}

impl ManagerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of concurrent operations (minimum 1).
    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max.max(1);
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the maximum accepted body size.
    pub fn with_max_body_bytes(mut self, max: u64) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Set the minimum progress step, clamped to `[0.0, 1.0]`.
    pub fn with_progress_step(mut self, step: f64) -> Self {
        self.progress_step = if step.is_finite() {
            step.clamp(0.0, 1.0)
        } else {
            DEFAULT_PROGRESS_STEP
        };
        self
    }

    /// Load settings from an INI file on top of the defaults.
    pub fn from_ini_file(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Load settings from INI text on top of the defaults.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: "<string>".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let Some(section) = ini.section(Some(CONFIG_SECTION)) else {
            return Ok(config);
        };

        if let Some(secs) = parse_key::<u64>(section.get("timeout_secs"), "timeout_secs")? {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(max) = parse_key::<usize>(
            section.get("max_concurrent_operations"),
            "max_concurrent_operations",
        )? {
            config = config.with_max_concurrent_operations(max);
        }
        if let Some(agent) = section.get("user_agent") {
            let agent = agent.trim();
            if !agent.is_empty() {
                config = config.with_user_agent(agent);
            }
        }
        if let Some(max) = parse_key::<u64>(section.get("max_body_bytes"), "max_body_bytes")? {
            config = config.with_max_body_bytes(max);
        }
        if let Some(step) = parse_key::<f64>(section.get("progress_step"), "progress_step")? {
            if !(0.0..=1.0).contains(&step) {
                return Err(ConfigError::InvalidValue {
                    key: "progress_step",
                    value: step.to_string(),
                    reason: "must be between 0.0 and 1.0".to_string(),
                });
            }
            config = config.with_progress_step(step);
        }

        Ok(config)
    }
}

fn parse_key<T>(raw: Option<&str>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: value.to_string(),
                reason: e.to_string(),
            }),
    }
}
