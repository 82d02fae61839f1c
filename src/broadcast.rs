//! Batched broadcast to active subscribers.

use futures::future::join_all;
use sms_core::{BatchSendRequest, BatchSmsClient, MAX_BATCH_RECIPIENTS};
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Subscribers included in some batch, whatever the gateway answered.
    pub processed: usize,
    /// Gateway calls issued.
    pub batches: usize,
    /// Gateway calls that returned an error.
    pub failed_batches: usize,
}

/// Splits `numbers` into consecutive groups of at most [`MAX_BATCH_RECIPIENTS`].
pub fn batches(numbers: &[String]) -> std::slice::Chunks<'_, String> {
    numbers.chunks(MAX_BATCH_RECIPIENTS)
}

#[derive(Clone)]
pub struct Broadcaster {
    gateway: Arc<dyn BatchSmsClient>,
    originator: String,
}

impl Broadcaster {
    pub fn new(gateway: Arc<dyn BatchSmsClient>, originator: impl Into<String>) -> Self {
        Self {
            gateway,
            originator: originator.into(),
        }
    }

    /// Send `message` to every number, one gateway call per batch.
    ///
    /// Batches are dispatched together; a failed batch is logged and does not
    /// affect the others.
    pub async fn broadcast(&self, numbers: &[String], message: &str) -> BroadcastReport {
        let sends = batches(numbers).enumerate().map(|(index, batch)| async move {
            let result = self
                .gateway
                .send_batch(BatchSendRequest {
                    to: batch,
                    from: &self.originator,
                    text: message,
                })
                .await;
            match result {
                Ok(response) => {
                    info!(batch = index, recipients = batch.len(), id = %response.id, "broadcast batch sent");
                    true
                }
                Err(e) => {
                    error!(batch = index, recipients = batch.len(), error = %e, "broadcast batch failed");
                    false
                }
            }
        });

        let outcomes = join_all(sends).await;
        let report = BroadcastReport {
            processed: numbers.len(),
            batches: outcomes.len(),
            failed_batches: outcomes.iter().filter(|ok| !**ok).count(),
        };
        info!(
            processed = report.processed,
            batches = report.batches,
            failed = report.failed_batches,
            "broadcast finished"
        );
        report
    }
}
