//! HTTP client for the assistant backend's chat endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::{AudioPayload, DeliveryClient, DeliveryReply};
use crate::error::DeliveryError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CHAT_PATH: &str = "chat/message";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    is_voice: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    reply: String,
    /// Base64 audio; absent or empty when synthesis was skipped
    #[serde(default)]
    audio: Option<String>,
}

impl ChatResponse {
    fn into_reply(self) -> Result<DeliveryReply, DeliveryError> {
        let audio = match self.audio.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(encoded) => Some(
                AudioPayload::from_base64(encoded)
                    .map_err(|e| DeliveryError::Malformed(format!("audio: {}", e)))?,
            ),
        };

        Ok(DeliveryReply {
            reply_text: self.reply,
            audio,
        })
    }
}

/// `DeliveryClient` backed by reqwest
pub struct HttpDeliveryClient {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpDeliveryClient {
    pub fn new(backend_url: &str, auth_token: Option<String>) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: chat_endpoint(backend_url),
            auth_token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn chat_endpoint(backend_url: &str) -> String {
    format!("{}/{}", backend_url.trim_end_matches('/'), CHAT_PATH)
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(&self, text: &str, mic_originated: bool) -> Result<DeliveryReply, DeliveryError> {
        let body = ChatRequest {
            message: text,
            is_voice: mic_originated,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "backend rejected message");
            return Err(DeliveryError::Transport(format!("backend returned {}", status)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Malformed(e.to_string()))?;

        debug!(
            reply_chars = parsed.reply.len(),
            has_audio = parsed.audio.is_some(),
            "backend replied"
        );
        parsed.into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_endpoint() {
        assert_eq!(
            chat_endpoint("http://localhost:8000/api/"),
            "http://localhost:8000/api/chat/message"
        );
        let client = HttpDeliveryClient::new("https://assistant.example", None).unwrap();
        assert_eq!(client.endpoint(), "https://assistant.example/chat/message");
    }

    #[test]
    fn test_request_body() {
        let json = serde_json::to_string(&ChatRequest {
            message: "I slept 6 hours",
            is_voice: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"message":"I slept 6 hours","is_voice":true}"#);
    }

    #[test]
    fn test_reply_with_audio() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"reply":"Try to sleep earlier","audio":"SUQzBA=="}"#).unwrap();
        let reply = response.into_reply().unwrap();
        assert_eq!(reply.reply_text, "Try to sleep earlier");
        assert_eq!(reply.audio.unwrap().as_bytes(), b"ID3\x04");
    }

    #[test]
    fn test_reply_without_audio() {
        for body in [r#"{"reply":"ok"}"#, r#"{"reply":"ok","audio":null}"#, r#"{"reply":"ok","audio":""}"#] {
            let response: ChatResponse = serde_json::from_str(body).unwrap();
            assert!(response.into_reply().unwrap().audio.is_none(), "{}", body);
        }
    }

    #[test]
    fn test_undecodable_audio_is_malformed() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"reply":"ok","audio":"%%%"}"#).unwrap();
        assert!(matches!(response.into_reply(), Err(DeliveryError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let client = HttpDeliveryClient::new("http://127.0.0.1:9", None).unwrap();
        let result = client.deliver("hello", false).await;
        assert!(matches!(result, Err(DeliveryError::Transport(_))));
    }
}
