//! Controller configuration with documented defaults
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables, so a deployment can run with no file at all.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{ControllerError, Result};

/// Configuration for one controller process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // === GAME SERVICES ===
    /// Base URL of the game services reverse proxy (http or https)
    ///
    /// The push stream URL is derived from it by swapping the scheme to ws/wss.
    pub base_url: String,

    /// Per-request timeout for HTTP calls (seconds)
    pub http_timeout_secs: u64,

    // === AUTOPLAY ===
    /// Start the control loop right after a successful bind
    pub autoplay_on_bind: bool,

    /// How long one autoplay wait blocks before looping (seconds)
    pub autoplay_wait_timeout_secs: u64,

    /// Upper bound between turn re-checks while waiting (milliseconds)
    ///
    /// Waiters wake on every snapshot pulse, and at least this often
    /// regardless, so a pulse that slipped past is noticed within one interval.
    pub turn_recheck_interval_ms: u64,

    /// Pause before re-checking when the current turn was already submitted
    pub duplicate_turn_delay_ms: u64,

    /// Pause after a failed submission before the loop retries
    pub submit_retry_delay_ms: u64,

    // === STREAM ===
    /// First reconnect delay; doubles per failure up to `reconnect_max_delay_ms`
    pub reconnect_base_delay_ms: u64,

    /// Reconnect delay cap
    pub reconnect_max_delay_ms: u64,

    /// Fetch one snapshot over HTTP per failed reconnect cycle
    pub poll_fallback: bool,

    /// Number of recent stream events kept for status queries
    pub recent_event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            http_timeout_secs: 10,

            autoplay_on_bind: true,
            autoplay_wait_timeout_secs: 120,
            turn_recheck_interval_ms: 3_000,
            duplicate_turn_delay_ms: 200,
            submit_retry_delay_ms: 500,

            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            poll_fallback: true,
            recent_event_capacity: 50,
        }
    }
}

impl ControllerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    ControllerError::Config(format!("Failed to read config file {:?}: {}", path, e))
                })?;
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `COWBOY_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("COWBOY_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var("COWBOY_AUTOPLAY_ON_BIND") {
            self.autoplay_on_bind = parse_bool(&raw);
        }
        if let Ok(raw) = std::env::var("COWBOY_AUTOPLAY_WAIT_TIMEOUT_SECONDS") {
            match raw.trim().parse::<f64>() {
                Ok(secs) if secs > 0.0 => self.autoplay_wait_timeout_secs = secs.ceil() as u64,
                _ => tracing::warn!(value = %raw, "ignoring invalid COWBOY_AUTOPLAY_WAIT_TIMEOUT_SECONDS"),
            }
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ControllerError::Config("base_url must not be empty".into()));
        }
        if self.autoplay_wait_timeout_secs == 0 || self.turn_recheck_interval_ms == 0 {
            return Err(ControllerError::Config(
                "wait timeout and turn recheck interval must be positive".into(),
            ));
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(ControllerError::Config("reconnect_base_delay_ms must be positive".into()));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(ControllerError::Config(format!(
                "reconnect_base_delay_ms ({}) should be <= reconnect_max_delay_ms ({})",
                self.reconnect_base_delay_ms, self.reconnect_max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn autoplay_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.autoplay_wait_timeout_secs)
    }

    pub fn turn_recheck_interval(&self) -> Duration {
        Duration::from_millis(self.turn_recheck_interval_ms)
    }

    pub fn duplicate_turn_delay(&self) -> Duration {
        Duration::from_millis(self.duplicate_turn_delay_ms)
    }

    pub fn submit_retry_delay(&self) -> Duration {
        Duration::from_millis(self.submit_retry_delay_ms)
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

/// `1`, `true`, `yes` and `on` (any case) are true; anything else is false
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
