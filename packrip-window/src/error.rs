use thiserror::Error;

pub type Result<T> = std::result::Result<T, WindowError>;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("packrip core error: {0}")]
    Core(#[from] packrip_core::PackripError),

    #[error("Rip window for channel {channel_id} is closed")]
    WindowClosed { channel_id: String },

    #[error("No rip window is open for channel {channel_id}")]
    NotOpen { channel_id: String },

    #[error("A rip window for channel {channel_id} is still being resolved")]
    ResolveInProgress { channel_id: String },

    #[error("Channel configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Failed to sign broadcast token: {0}")]
    Signing(String),

    #[error("Invalid broadcast token: {0}")]
    InvalidToken(String),

    #[error("Broadcast token expired")]
    TokenExpired,

    #[error("Push transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Push endpoint rejected broadcast with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
