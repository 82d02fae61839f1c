use sms_core::{Headers, InboundMessage, InboundWebhook, SmsError, WebhookError, WebhookResponse};
use std::sync::Arc;

/// Framework-agnostic webhook processor wrapping the configured inbound provider
#[derive(Clone)]
pub struct WebhookProcessor {
    hook: Arc<dyn InboundWebhook>,
}

impl WebhookProcessor {
    pub fn new(hook: Arc<dyn InboundWebhook>) -> Self {
        Self { hook }
    }

    pub fn provider(&self) -> &'static str {
        self.hook.provider()
    }

    /// Decode an incoming webhook request into a normalized message
    pub fn parse(&self, headers: &Headers, body: &[u8]) -> Result<InboundMessage, WebhookError> {
        self.hook.parse_inbound(headers, body).map_err(|e| match e {
            SmsError::Invalid(msg) => WebhookError::ParseError(msg),
            other => WebhookError::SmsError(other),
        })
    }

    /// Response sent back to the provider once the message has been handed off.
    pub fn acknowledge(&self) -> WebhookResponse {
        WebhookResponse::ack()
    }
}

/// Helper trait for framework adapters to convert headers
pub trait HeaderConverter {
    type HeaderType;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers;
}

/// Helper trait for framework adapters to convert responses
pub trait ResponseConverter {
    type ResponseType;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType;
}
