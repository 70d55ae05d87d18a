use crate::error::{PackripError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://api.twitch.tv/helix/extensions/pubsub";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub broadcast: Option<BroadcastSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    /// How long a window accepts entries
    pub duration_secs: u64,
    /// Time between window openings in autonomous mode
    pub period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub client_id: String,
    /// Base64-encoded shared secret
    pub secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_PUBSUB_ENDPOINT.to_string()
}

fn default_token_ttl() -> u64 {
    45
}

fn default_timeout() -> u64 {
    5
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            duration_secs: 70,
            period_secs: 6 * 60,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            window: WindowSettings::default(),
            broadcast: None,
        }
    }
}

impl WindowSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl BroadcastSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn secret_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.secret.trim())
            .map_err(|e| PackripError::config(format!("Broadcast secret is not base64: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(PackripError::config("Broadcast endpoint cannot be empty"));
        }

        if self.client_id.is_empty() {
            return Err(PackripError::config("Broadcast client id cannot be empty"));
        }

        if self.secret_bytes()?.is_empty() {
            return Err(PackripError::config("Broadcast secret cannot be empty"));
        }

        if !(30..=60).contains(&self.token_ttl_secs) {
            return Err(PackripError::config(
                "Broadcast token lifetime must be between 30 and 60 seconds",
            ));
        }

        if !(1..=30).contains(&self.timeout_secs) {
            return Err(PackripError::config(
                "Broadcast timeout must be between 1 and 30 seconds",
            ));
        }

        Ok(())
    }
}

impl ServiceConfig {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            ..Self::default()
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Overlay `PACKRIP_*` environment variables on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(channel) = std::env::var("PACKRIP_CHANNEL_ID") {
            self.channel_id = channel;
        }

        let client_id = std::env::var("PACKRIP_CLIENT_ID").ok();
        let secret = std::env::var("PACKRIP_EXTENSION_SECRET").ok();

        if let Some(broadcast) = self.broadcast.as_mut() {
            if let Some(client_id) = client_id {
                broadcast.client_id = client_id;
            }
            if let Some(secret) = secret {
                broadcast.secret = secret;
            }
        } else if let (Some(client_id), Some(secret)) = (client_id, secret) {
            self.broadcast = Some(BroadcastSettings {
                endpoint: default_endpoint(),
                client_id,
                secret,
                token_ttl_secs: default_token_ttl(),
                timeout_secs: default_timeout(),
            });
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_id.is_empty() {
            return Err(PackripError::config("Channel id cannot be empty"));
        }

        if self.window.duration_secs == 0 {
            return Err(PackripError::config("Window duration must be greater than 0"));
        }

        if self.window.period_secs < self.window.duration_secs {
            return Err(PackripError::config(
                "Window period cannot be shorter than the window duration",
            ));
        }

        if let Some(broadcast) = &self.broadcast {
            broadcast.validate()?;
        }

        Ok(())
    }
}
