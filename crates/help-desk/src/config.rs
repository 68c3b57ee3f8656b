//! Simulation configuration.
//!
//! The four simulation parameters come from the command line; the timing
//! knobs come from environment variables with sensible defaults.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default fixed session duration in microseconds.
pub const DEFAULT_SESSION_MICROS: u64 = 200;

/// Default seeker think time between sessions in microseconds.
pub const DEFAULT_THINK_MICROS: u64 = 2_000;

/// Default delay before a rejected seeker asks again, in microseconds.
pub const DEFAULT_RETRY_BACKOFF_MICROS: u64 = 2_000;

/// Default coordinator mailbox size.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Usage line printed when the argument count is wrong.
pub const USAGE: &str = "usage: help-desk <seekers> <helpers> <chairs> <quota>";

/// Help desk simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of seeker actors.
    pub seekers: usize,

    /// Number of helper actors.
    pub helpers: usize,

    /// Waiting-room capacity (chairs).
    pub chairs: usize,

    /// Sessions each seeker must receive before it leaves.
    pub quota: u32,

    /// Fixed duration of one session (default: 200µs).
    pub session_duration: Duration,

    /// Time a seeker spends away between sessions (default: 2ms).
    pub think_time: Duration,

    /// Delay before a rejected seeker retries admission (default: 2ms).
    pub retry_backoff: Duration,

    /// Coordinator mailbox capacity (default: 64).
    pub channel_buffer: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("expected exactly 4 arguments; {USAGE}")]
    Usage,

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Parameter must be a positive integer: {0}")]
    NonPositive(String),
}

impl Config {
    /// Build a configuration with default timings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] if any count is zero.
    pub fn new(seekers: usize, helpers: usize, chairs: usize, quota: u32) -> Result<Self, ConfigError> {
        let config = Self {
            seekers,
            helpers,
            chairs,
            quota,
            session_duration: Duration::from_micros(DEFAULT_SESSION_MICROS),
            think_time: Duration::from_micros(DEFAULT_THINK_MICROS),
            retry_backoff: Duration::from_micros(DEFAULT_RETRY_BACKOFF_MICROS),
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from command-line arguments and the process environment.
    ///
    /// `args` excludes the program name.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env(args: &[String]) -> Result<Self, ConfigError> {
        Self::from_vars(args, &env::vars().collect())
    }

    /// Load configuration from arguments and a variable map (for testing).
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Usage`] unless exactly four arguments are given
    /// - [`ConfigError::InvalidValue`] for unparseable numbers
    /// - [`ConfigError::NonPositive`] for zero counts
    pub fn from_vars(args: &[String], vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let [seekers, helpers, chairs, quota] = args else {
            return Err(ConfigError::Usage);
        };

        let mut config = Self::new(
            parse_count(seekers, "seekers")?,
            parse_count(helpers, "helpers")?,
            parse_count(chairs, "chairs")?,
            parse_count(quota, "quota")?,
        )?;

        config.session_duration =
            micros_var(vars, "HELP_DESK_SESSION_MICROS", DEFAULT_SESSION_MICROS)?;
        config.think_time = micros_var(vars, "HELP_DESK_THINK_MICROS", DEFAULT_THINK_MICROS)?;
        config.retry_backoff = micros_var(
            vars,
            "HELP_DESK_RETRY_BACKOFF_MICROS",
            DEFAULT_RETRY_BACKOFF_MICROS,
        )?;

        if let Some(raw) = vars.get("HELP_DESK_CHANNEL_BUFFER") {
            config.channel_buffer = raw.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("HELP_DESK_CHANNEL_BUFFER must be an integer: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject non-positive parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("seekers", self.seekers == 0),
            ("helpers", self.helpers == 0),
            ("chairs", self.chairs == 0),
            ("quota", self.quota == 0),
            ("channel_buffer", self.channel_buffer == 0),
        ];
        match checks.iter().find(|(_, bad)| *bad) {
            Some((name, _)) => Err(ConfigError::NonPositive((*name).to_string())),
            None => Ok(()),
        }
    }

    /// Override all timings at once.
    #[must_use]
    pub fn with_timings(mut self, session: Duration, think: Duration, retry: Duration) -> Self {
        self.session_duration = session;
        self.think_time = think;
        self.retry_backoff = retry;
        self
    }
}

fn parse_count<T>(raw: &str, name: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return Err(ConfigError::NonPositive(name.to_string()));
    }
    trimmed
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("{name} must be an integer: {e}")))
}

fn micros_var(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let micros = match vars.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{key} must be microseconds: {e}")))?,
        None => default,
    };
    Ok(Duration::from_micros(micros))
}
