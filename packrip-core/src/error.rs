use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackripError>;

#[derive(Error, Debug)]
pub enum PackripError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Collection configuration error: {0}")]
    Collection(String),

    #[error("No available cards for any rarity")]
    EmptyPool,

    #[error("Failed to persist card: {0}")]
    Persist(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PackripError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn collection(msg: impl Into<String>) -> Self {
        Self::Collection(msg.into())
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors that describe a channel-wide misconfiguration rather
    /// than a problem with a single draw.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Collection(_))
    }
}
