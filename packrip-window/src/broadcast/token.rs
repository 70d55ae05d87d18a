use crate::BroadcastError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubsubPerms {
    pub send: Vec<String>,
}

/// Claims of a channel-scoped broadcast token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastClaims {
    pub exp: i64,
    pub iat: i64,
    pub sub: String,
    pub channel_id: String,
    pub role: String,
    pub pubsub_perms: PubsubPerms,
}

/// Issues short-lived HS256 tokens that only allow broadcasting to one channel.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> Result<HmacSha256, BroadcastError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| BroadcastError::Signing(e.to_string()))
    }

    pub fn sign(&self, channel_id: &str, now: DateTime<Utc>) -> Result<String, BroadcastError> {
        let claims = BroadcastClaims {
            exp: now.timestamp() + self.ttl.as_secs() as i64,
            iat: now.timestamp(),
            sub: channel_id.to_string(),
            channel_id: channel_id.to_string(),
            role: "external".to_string(),
            pubsub_perms: PubsubPerms {
                send: vec!["broadcast".to_string()],
            },
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<BroadcastClaims, BroadcastError> {
        let (signing_input, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| BroadcastError::InvalidToken("missing signature".to_string()))?;
        let (_, claims) = signing_input
            .split_once('.')
            .ok_or_else(|| BroadcastError::InvalidToken("missing claims".to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| BroadcastError::InvalidToken(e.to_string()))?;

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| BroadcastError::InvalidToken("signature mismatch".to_string()))?;

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|e| BroadcastError::InvalidToken(e.to_string()))?;
        let claims: BroadcastClaims = serde_json::from_slice(&claims)?;

        if now.timestamp() >= claims.exp {
            return Err(BroadcastError::TokenExpired);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .field("secret", &"<redacted>")
            .finish()
    }
}
