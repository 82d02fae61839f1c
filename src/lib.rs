//! # smslist
//!
//! SMS subscription list with keyword opt-in/opt-out and batched broadcasts.
//!
//! ## Features
//!
//! - **Inbound webhook**: `SUBSCRIBE` and `STOP` replies update the subscriber list
//! - **Broadcasts**: operator messages go out in batches of at most 50 recipients
//! - **Pluggable storage**: in-memory or JSON file backed subscriber store
//! - **Configuration**: layered files plus environment variables
//! - **Observability**: structured logging with `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smslist::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     init_tracing(&config.logging);
//!     serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod service;
pub mod store;
pub mod subscriber;
pub mod telemetry;
pub mod web;

pub use config::*;

use sms_messagebird::MessageBirdClient;
use sms_web_generic::WebhookProcessor;
use std::sync::Arc;
use crate::store::{JsonFileStore, MemoryStore, StoreError, SubscriberStore};
use tracing::info;

/// Common imports for smslist usage
pub mod prelude {
    pub use crate::broadcast::{BroadcastReport, Broadcaster};
    pub use crate::config::{
        AppConfig, LoggingConfig, MessageBirdConfig, ServerConfig, StoreBackend, StoreConfig,
    };
    pub use crate::service::SubscriptionService;
    pub use crate::store::{JsonFileStore, MemoryStore, StoreError, SubscriberStore};
    pub use crate::subscriber::{Keyword, Notification, Subscriber, Transition};
    pub use crate::telemetry::init_tracing;
    pub use crate::web::{router, AppState};
    pub use crate::{build_state, serve};
    pub use sms_core::*;
}

/// Open the configured store.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn SubscriberStore>, StoreError> {
    let store: Arc<dyn SubscriberStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(JsonFileStore::open(&config.path).await?),
    };
    Ok(store)
}

/// Wire store, gateway and webhook parser into router state.
pub async fn build_state(config: &AppConfig) -> Result<web::AppState, StoreError> {
    let store = open_store(&config.store).await?;
    let client = Arc::new(MessageBirdClient::with_base_url(
        config.messagebird.api_key.clone(),
        config.messagebird.base_url.clone(),
    ));
    let service =
        service::SubscriptionService::new(store, client.clone(), config.messagebird.originator.clone());
    Ok(web::AppState {
        service,
        processor: WebhookProcessor::new(client),
    })
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config).await?;
    let app = web::router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, backend = ?config.store.backend, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
