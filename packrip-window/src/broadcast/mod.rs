pub mod token;

pub use token::{BroadcastClaims, TokenSigner};

use crate::BroadcastError;
use async_trait::async_trait;
use chrono::Utc;
use packrip_core::{BroadcastSettings, DrawResult, Item};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Message shown by the overlay when a viewer's pack is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RipResultEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub viewer_id: String,
    pub rarity: String,
    pub item: Item,
}

impl RipResultEnvelope {
    pub fn new(result: &DrawResult) -> Self {
        Self {
            kind: "rip-result".to_string(),
            viewer_id: result.viewer_id.clone(),
            rarity: result.rarity.clone(),
            item: result.item.clone(),
        }
    }
}

/// One authenticated push to the messaging endpoint
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub endpoint: String,
    pub client_id: String,
    pub token: String,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, request: &PushRequest) -> Result<(), BroadcastError>;
}

/// HTTPS transport with a short per-request timeout
pub struct HttpPushTransport {
    client: reqwest::Client,
}

impl HttpPushTransport {
    pub fn new(timeout: Duration) -> Result<Self, BroadcastError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(&self, request: &PushRequest) -> Result<(), BroadcastError> {
        let response = self
            .client
            .post(&request.endpoint)
            .bearer_auth(&request.token)
            .header("Client-Id", &request.client_id)
            .json(&request.body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BroadcastError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Announces draw results to the channel's display surface.
///
/// Delivery is best effort: a failed publish is logged and reported to the
/// caller, never retried.
pub struct ResultBroadcaster {
    signer: TokenSigner,
    transport: Arc<dyn PushTransport>,
    endpoint: String,
    client_id: String,
}

impl ResultBroadcaster {
    pub fn new(
        settings: &BroadcastSettings,
        transport: Arc<dyn PushTransport>,
    ) -> Result<Self, BroadcastError> {
        let secret = settings
            .secret_bytes()
            .map_err(|e| BroadcastError::Signing(e.to_string()))?;

        Ok(Self {
            signer: TokenSigner::new(secret, settings.token_ttl()),
            transport,
            endpoint: settings.endpoint.clone(),
            client_id: settings.client_id.clone(),
        })
    }

    /// Broadcaster backed by [`HttpPushTransport`].
    pub fn from_settings(settings: &BroadcastSettings) -> Result<Self, BroadcastError> {
        let transport = HttpPushTransport::new(settings.timeout())?;
        Self::new(settings, Arc::new(transport))
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn build_request(
        &self,
        channel_id: &str,
        result: &DrawResult,
    ) -> Result<PushRequest, BroadcastError> {
        let token = self.signer.sign(channel_id, Utc::now())?;
        let message = serde_json::to_string(&RipResultEnvelope::new(result))?;

        Ok(PushRequest {
            endpoint: self.endpoint.clone(),
            client_id: self.client_id.clone(),
            token,
            body: serde_json::json!({
                "broadcaster_id": channel_id,
                "target": ["broadcast"],
                "is_global_broadcast": false,
                "message": message,
            }),
        })
    }

    pub async fn publish(&self, channel_id: &str, result: &DrawResult) -> Result<(), BroadcastError> {
        let outcome = match self.build_request(channel_id, result) {
            Ok(request) => self.transport.send(&request).await,
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(()) => tracing::debug!(
                "Broadcast {} result for {} to {}",
                result.rarity,
                result.viewer_id,
                channel_id
            ),
            Err(e) => tracing::warn!(
                "Failed to broadcast result for {} to {}: {}",
                result.viewer_id,
                channel_id,
                e
            ),
        }

        outcome
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every push and answers with a fixed status.
    pub struct RecordingTransport {
        pub requests: Mutex<Vec<PushRequest>>,
        status: u16,
    }

    impl RecordingTransport {
        pub fn ok() -> Self {
            Self::with_status(200)
        }

        pub fn with_status(status: u16) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                status,
            }
        }

        pub fn sent(&self) -> Vec<PushRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl PushTransport for RecordingTransport {
        async fn send(&self, request: &PushRequest) -> Result<(), BroadcastError> {
            self.requests.lock().push(request.clone());
            if (200..300).contains(&self.status) {
                Ok(())
            } else {
                Err(BroadcastError::Rejected {
                    status: self.status,
                    body: "rejected".to_string(),
                })
            }
        }
    }

    pub fn settings() -> BroadcastSettings {
        BroadcastSettings {
            endpoint: "https://push.example/pubsub".to_string(),
            client_id: "client-123".to_string(),
            secret: "ZXh0ZW5zaW9uIHNlY3JldA==".to_string(),
            token_ttl_secs: 45,
            timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{settings, RecordingTransport};
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn result() -> DrawResult {
        DrawResult {
            viewer_id: "alice".to_string(),
            rarity: "Rare".to_string(),
            item: Item::new("Knight", "Rare", 3.0),
        }
    }

    #[tokio::test]
    async fn test_publish_sends_signed_envelope() {
        let transport = Arc::new(RecordingTransport::ok());
        let broadcaster = ResultBroadcaster::new(&settings(), transport.clone()).unwrap();

        broadcaster.publish("chan", &result()).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let request = &sent[0];
        assert_eq!(request.endpoint, "https://push.example/pubsub");
        assert_eq!(request.client_id, "client-123");
        assert_eq!(request.body["broadcaster_id"], "chan");
        assert_eq!(request.body["target"][0], "broadcast");

        let claims = broadcaster.signer().verify(&request.token, Utc::now()).unwrap();
        assert_eq!(claims.channel_id, "chan");

        let message: serde_json::Value =
            serde_json::from_str(request.body["message"].as_str().unwrap()).unwrap();
        assert_eq!(message["type"], "rip-result");
        assert_eq!(message["viewerId"], "alice");
        assert_eq!(message["rarity"], "Rare");
        assert_eq!(message["item"]["name"], "Knight");
    }

    #[tokio::test]
    async fn test_rejected_publish_is_reported() {
        let transport = Arc::new(RecordingTransport::with_status(500));
        let broadcaster = ResultBroadcaster::new(&settings(), transport.clone()).unwrap();

        let err = broadcaster.publish("chan", &result()).await.unwrap_err();
        assert!(matches!(err, BroadcastError::Rejected { status: 500, .. }));
        assert_eq!(transport.sent().len(), 1);
    }

    /// Accepts one connection, captures the full request and answers with
    /// `response`.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request_complete(&raw) {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}/pubsub", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= head_end + 4 + content_length
    }

    fn push_request(endpoint: String) -> PushRequest {
        PushRequest {
            endpoint,
            client_id: "client-123".to_string(),
            token: "header.claims.sig".to_string(),
            body: serde_json::json!({ "broadcaster_id": "chan", "target": ["broadcast"] }),
        }
    }

    #[tokio::test]
    async fn test_http_transport_sends_auth_headers() {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 204 No Content\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let transport = HttpPushTransport::new(Duration::from_secs(5)).unwrap();

        transport.send(&push_request(endpoint)).await.unwrap();

        let raw = server.await.unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        let head = head.to_ascii_lowercase();
        assert!(head.starts_with("post /pubsub http/1.1"));
        assert!(head.contains("authorization: bearer header.claims.sig"));
        assert!(head.contains("client-id: client-123"));
        assert!(head.contains("content-type: application/json"));

        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["broadcaster_id"], "chan");
        assert_eq!(body["target"][0], "broadcast");
    }

    #[tokio::test]
    async fn test_http_transport_reports_status() {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 7\r\nconnection: close\r\n\r\nexpired",
        )
        .await;
        let transport = HttpPushTransport::new(Duration::from_secs(5)).unwrap();

        let err = transport.send(&push_request(endpoint)).await.unwrap_err();
        server.await.unwrap();

        match err {
            BroadcastError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "expired");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_http_transport_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/pubsub", listener.local_addr().unwrap());
        // accept and never answer
        let _silent = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let transport = HttpPushTransport::new(Duration::from_millis(200)).unwrap();
        let started = Instant::now();
        let err = transport.send(&push_request(endpoint)).await.unwrap_err();

        assert!(matches!(&err, BroadcastError::Transport(e) if e.is_timeout()));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_bad_secret_rejected() {
        let mut settings = settings();
        settings.secret = "%%%".to_string();
        let transport = Arc::new(RecordingTransport::ok());
        assert!(matches!(
            ResultBroadcaster::new(&settings, transport),
            Err(BroadcastError::Signing(_))
        ));
    }
}
