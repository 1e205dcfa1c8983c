//! Client configuration management.
//!
//! Resolves every setting from CLI overrides, then the environment, then
//! defaults, and validates the result.

use relay_chess::RoomId;

/// Relay endpoint used when neither `--relay` nor `RELAY_URL` is set.
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:4000/relay";

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Relay WebSocket endpoint, without the room query
    pub relay_url: String,
    /// Room to join
    pub room_id: RoomId,
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `relay_override` - Optional relay URL override (from CLI args)
    /// * `room_override` - Optional room id override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if the room id is missing or a value is invalid
    pub fn from_env(
        relay_override: Option<String>,
        room_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::resolve(relay_override, room_override, |key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if the room id is missing or a value is invalid
    pub fn resolve<F>(
        relay_override: Option<String>,
        room_override: Option<String>,
        var: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relay_url = relay_override
            .or_else(|| var("RELAY_URL"))
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());

        let room = room_override
            .or_else(|| var("ROOM_ID"))
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "ROOM_ID".to_string(),
                hint: "Pass --room ID or set ROOM_ID".to_string(),
            })?;

        let config = Self {
            relay_url: relay_url.trim().to_string(),
            room_id: RoomId::new(&room),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns error if the room id is empty or the relay URL isn't a
    /// WebSocket URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room_id.is_empty() {
            return Err(ConfigError::Invalid {
                var: "ROOM_ID".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        let scheme_ok = ["ws://", "wss://"]
            .iter()
            .any(|scheme| self.relay_url.starts_with(scheme));
        if !scheme_ok || self.relay_url.len() <= "wss://".len() {
            return Err(ConfigError::Invalid {
                var: "RELAY_URL".to_string(),
                reason: format!("'{}' is not a ws:// or wss:// URL", self.relay_url),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
