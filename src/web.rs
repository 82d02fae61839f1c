//! Axum routes: the inbound webhook and the operator pages.

use crate::service::SubscriptionService;
use axum::{
    body::Bytes,
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use sms_core::{Headers, WebhookResponse};
use sms_web_generic::{HeaderConverter, ResponseConverter, WebhookProcessor};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: SubscriptionService,
    pub processor: WebhookProcessor,
}

/// Axum-specific header converter
pub struct AxumHeaderConverter;

impl HeaderConverter for AxumHeaderConverter {
    type HeaderType = HeaderMap;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers {
        headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Axum-specific response converter
pub struct AxumResponseConverter;

impl ResponseConverter for AxumResponseConverter {
    type ResponseType = Response;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType {
        let status =
            StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, response.content_type)],
            response.body,
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/webhook", post(webhook))
        .route("/send", post(send))
        .with_state(state)
}

/// POST /webhook
///
/// Always acknowledged with `200 OK`; the provider does not read the body.
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let generic_headers = AxumHeaderConverter::to_generic_headers(&headers);
    match state.processor.parse(&generic_headers, &body) {
        Ok(message) => {
            info!(from = %message.from, provider = state.processor.provider(), "inbound message");
            // Background task; its outcome is only logged.
            drop(state.service.spawn_inbound(message));
        }
        Err(e) => warn!(error = %e, "ignoring undecodable webhook"),
    }
    AxumResponseConverter::from_webhook_response(state.processor.acknowledge())
}

/// GET /
///
/// A store failure renders a count of zero.
pub async fn home(State(state): State<AppState>) -> Html<String> {
    let count = match state.service.active_count().await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "counting subscribers failed");
            0
        }
    };
    Html(home_page(count))
}

#[derive(Debug, Deserialize)]
pub struct SendForm {
    pub message: String,
}

/// POST /send
///
/// A store failure renders a count of zero; nothing was sent.
pub async fn send(State(state): State<AppState>, Form(form): Form<SendForm>) -> Html<String> {
    let processed = match state.service.broadcast(&form.message).await {
        Ok(report) => report.processed,
        Err(e) => {
            error!(error = %e, "loading subscribers for broadcast failed");
            0
        }
    };
    Html(sent_page(processed))
}

fn home_page(count: usize) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>SMS Marketing</title></head>
<body>
<h1>SMS Marketing</h1>
<p>This is an SMS marketing campaign. You have <strong id="count">{count}</strong> subscribers.</p>
<form action="/send" method="post">
<p><textarea name="message" rows="4" cols="60" placeholder="Your message"></textarea></p>
<p><input type="submit" value="Send to all subscribers"></p>
</form>
</body>
</html>
"#
    )
}

fn sent_page(count: usize) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>SMS Marketing</title></head>
<body>
<h1>SMS Marketing</h1>
<p>Your message has been sent to <strong id="count">{count}</strong> subscribers.</p>
<p><a href="/">Back</a></p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_expose_the_count() {
        assert!(home_page(7).contains(r#"<strong id="count">7</strong>"#));
        assert!(sent_page(120).contains(r#"<strong id="count">120</strong>"#));
    }

    #[test]
    fn header_conversion_keeps_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/x-www-form-urlencoded".parse().unwrap());
        let generic = AxumHeaderConverter::to_generic_headers(&headers);
        assert_eq!(
            generic,
            vec![(
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string()
            )]
        );
    }
}
