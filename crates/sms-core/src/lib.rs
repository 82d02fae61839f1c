//! # SMS Core
//!
//! Core traits and types shared by the smslist gateway and webhook crates.
//!
//! This crate provides the fundamental building blocks for SMS operations:
//! - [`BatchSmsClient`] trait for sending one body to up to 50 recipients at once
//! - [`InboundWebhook`] trait for processing incoming webhooks
//! - Common types for requests, responses, and errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use sms_core::{BatchSendRequest, BatchSmsClient};
//!
//! let recipients = vec!["+31600000001".to_string(), "+31600000002".to_string()];
//! let response = client.send_batch(BatchSendRequest {
//!     from: "SMSList",
//!     to: &recipients,
//!     text: "Hello subscribers!"
//! }).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum number of recipients a gateway accepts in a single send call.
pub const MAX_BATCH_RECIPIENTS: usize = 50;

/// Errors that can occur during SMS operations
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// HTTP communication error
    #[error("http error: {0}")]
    Http(String),
    /// Authentication/authorization error
    #[error("authentication error: {0}")]
    Auth(String),
    /// Invalid request parameters
    #[error("invalid request: {0}")]
    Invalid(String),
    /// SMS provider returned an error
    #[error("provider error: {0}")]
    Provider(String),
    /// Unexpected error occurred
    #[error("unexpected: {0}")]
    Unexpected(String),
}

/// Web-specific error types for webhook processing
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("parsing failed: {0}")]
    ParseError(String),
    #[error("SMS processing error: {0}")]
    SmsError(#[from] SmsError),
}

/// One body addressed to up to [`MAX_BATCH_RECIPIENTS`] numbers.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSendRequest<'a> {
    pub to: &'a [String],
    pub from: &'a str,
    pub text: &'a str,
}

impl BatchSendRequest<'_> {
    /// Checks the recipient list against the gateway's per-call bounds.
    pub fn validate(&self) -> Result<(), SmsError> {
        if self.to.is_empty() {
            return Err(SmsError::Invalid("batch has no recipients".into()));
        }
        if self.to.len() > MAX_BATCH_RECIPIENTS {
            return Err(SmsError::Invalid(format!(
                "batch has {} recipients, limit is {}",
                self.to.len(),
                MAX_BATCH_RECIPIENTS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub id: String,
    /// Name of the backend/provider that produced the response, e.g. "messagebird".
    pub provider: &'static str,
    /// Raw provider payload for debugging / audit.
    pub raw: serde_json::Value,
}

/// Normalized inbound message (e.g., a reply).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    pub text: String,
    pub timestamp: Option<OffsetDateTime>,
    pub provider: &'static str,
    pub raw: serde_json::Value,
}

/// Generic webhook response that can be converted to any framework's response type
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl WebhookResponse {
    /// Fixed acknowledgment; the far end never parses it.
    pub fn ack() -> Self {
        Self {
            status: 200,
            body: "OK".to_string(),
            content_type: "text/plain; charset=utf-8".to_string(),
        }
    }
}

/// Gateways that accept several recipients for the same body in one call.
#[async_trait]
pub trait BatchSmsClient: Send + Sync {
    /// Send one text SMS to every number in `req.to`.
    ///
    /// Implementations must reject requests that fail [`BatchSendRequest::validate`]
    /// without contacting the provider.
    async fn send_batch(&self, req: BatchSendRequest<'_>) -> Result<SendResponse, SmsError>;
}

/// Utility to create a pseudo id if a provider doesn't return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// Provider-agnostic inbound webhook interface.
pub trait InboundWebhook: Send + Sync {
    /// Stable provider key, e.g. "messagebird".
    fn provider(&self) -> &'static str;
    /// Parse the incoming HTTP payload (headers + raw body) into a normalized `InboundMessage`.
    fn parse_inbound(&self, headers: &Headers, body: &[u8]) -> Result<InboundMessage, SmsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("+3160000{:04}", i)).collect()
    }

    #[test]
    fn batch_validation_bounds() {
        let empty: Vec<String> = vec![];
        let req = BatchSendRequest {
            to: &empty,
            from: "x",
            text: "hi",
        };
        assert!(matches!(req.validate(), Err(SmsError::Invalid(_))));

        let full = numbers(MAX_BATCH_RECIPIENTS);
        let req = BatchSendRequest {
            to: &full,
            from: "x",
            text: "hi",
        };
        assert!(req.validate().is_ok());

        let over = numbers(MAX_BATCH_RECIPIENTS + 1);
        let req = BatchSendRequest {
            to: &over,
            from: "x",
            text: "hi",
        };
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("51 recipients"));
    }

    #[test]
    fn ack_is_plain_ok() {
        let res = WebhookResponse::ack();
        assert_eq!(res.status, 200);
        assert_eq!(res.body, "OK");
    }
}
