pub mod push;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use push::{FcmProvider, MockPushProvider, ServiceAccountKey};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

/// One notification fanned out to a list of device tokens.
#[derive(Debug, Clone)]
pub struct MulticastMessage {
    pub title: String,
    pub body: String,
    pub tokens: Vec<String>,
    pub data: Option<HashMap<String, String>>,
}

/// Outcome of one delivery attempt to one device token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error),
        }
    }
}

/// Per-token outcomes of a multicast send, one entry per requested token,
/// in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticastResponse {
    pub responses: Vec<SendOutcome>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl MulticastResponse {
    pub fn from_outcomes(responses: Vec<SendOutcome>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        let failure_count = responses.len() - success_count;
        Self {
            responses,
            success_count,
            failure_count,
        }
    }

    /// Whether the first token's delivery succeeded.
    pub fn first_delivered(&self) -> bool {
        self.responses.first().map(|r| r.success).unwrap_or(false)
    }
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Deliver one notification to every token in the message, reporting
    /// one outcome per token. An `Err` means the attempt as a whole
    /// failed (credentials, token exchange, transport).
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastResponse, ProviderError>;
}
