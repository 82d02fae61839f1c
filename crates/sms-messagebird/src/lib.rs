use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sms_core::{
    BatchSendRequest, BatchSmsClient, Headers, InboundMessage, InboundWebhook, SendResponse,
    SmsError,
};
use std::collections::HashMap;
use tracing::{debug, warn};

const PROVIDER: &str = "messagebird";

/// MessageBird REST client.
#[derive(Clone, Debug)]
pub struct MessageBirdClient {
    /// Live or test access key, sent as `Authorization: AccessKey <key>`.
    pub access_key: String,
    /// API base URL; override for testing/mocking.
    pub base_url: String,
    #[cfg(feature = "reqwest")]
    http: reqwest::Client,
}

impl MessageBirdClient {
    pub fn new<S: Into<String>>(access_key: S) -> Self {
        Self::with_base_url(access_key, "https://rest.messagebird.com".to_string())
    }

    pub fn with_base_url<S: Into<String>>(access_key: S, base_url: String) -> Self {
        Self {
            access_key: access_key.into(),
            base_url,
            #[cfg(feature = "reqwest")]
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageBirdSendRequest<'a> {
    originator: &'a str,
    recipients: &'a [String],
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageBirdErrors {
    errors: Vec<MessageBirdErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct MessageBirdErrorEntry {
    code: Option<i64>,
    description: String,
}

/// Pulls the first `errors[].description` out of an error body, falling back to the raw text.
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<MessageBirdErrors>(body) {
        Ok(parsed) => match parsed.errors.first() {
            Some(entry) => match entry.code {
                Some(code) => format!("{} (code {})", entry.description, code),
                None => entry.description.clone(),
            },
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

impl MessageBirdClient {
    #[cfg(feature = "reqwest")]
    async fn post_message(&self, payload: &MessageBirdSendRequest<'_>) -> Result<SendResponse, SmsError> {
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("AccessKey {}", self.access_key),
            )
            .json(payload)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let detail = describe_error(&body);
            warn!(%status, recipients = payload.recipients.len(), "messagebird rejected send");
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(SmsError::Auth(detail));
            }
            return Err(SmsError::Provider(format!("HTTP {}: {}", status, detail)));
        }

        let raw_text = res
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

        let id = raw_json
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(sms_core::fallback_id);

        debug!(%id, recipients = payload.recipients.len(), "messagebird accepted send");
        Ok(SendResponse {
            id,
            provider: PROVIDER,
            raw: raw_json,
        })
    }
}

#[async_trait]
impl BatchSmsClient for MessageBirdClient {
    async fn send_batch(&self, req: BatchSendRequest<'_>) -> Result<SendResponse, SmsError> {
        req.validate()?;
        #[cfg(not(feature = "reqwest"))]
        {
            return Err(SmsError::Unexpected("reqwest feature disabled".into()));
        }
        #[cfg(feature = "reqwest")]
        {
            let payload = MessageBirdSendRequest {
                originator: req.from,
                recipients: req.to,
                body: req.text,
            };
            self.post_message(&payload).await
        }
    }
}

/// Form fields MessageBird posts to a webhook for an inbound SMS.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageBirdInbound {
    pub originator: String,
    pub payload: String,
    pub recipient: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "createdDatetime")]
    pub created_datetime: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl From<MessageBirdInbound> for InboundMessage {
    fn from(m: MessageBirdInbound) -> Self {
        let ts = m.created_datetime.as_deref().and_then(|s| {
            time::OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).ok()
        });
        let raw = serde_json::to_value(&m).unwrap_or_default();
        InboundMessage {
            id: m.id,
            from: m.originator,
            to: m.recipient.unwrap_or_default(),
            text: m.payload,
            timestamp: ts,
            provider: PROVIDER,
            raw,
        }
    }
}

impl InboundWebhook for MessageBirdClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn parse_inbound(&self, _headers: &Headers, body: &[u8]) -> Result<InboundMessage, SmsError> {
        let inbound: MessageBirdInbound = serde_urlencoded::from_bytes(body)
            .map_err(|e| SmsError::Invalid(format!("form decode: {}", e)))?;
        Ok(inbound.into())
    }
}
