//! Orchestration of store, gateway and the subscription state machine.

use crate::broadcast::{BroadcastReport, Broadcaster};
use crate::store::{StoreError, SubscriberStore};
use crate::subscriber::{decide, Notification, Transition, Write};
use sms_core::{BatchSendRequest, BatchSmsClient, InboundMessage};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn SubscriberStore>,
    gateway: Arc<dyn BatchSmsClient>,
    originator: String,
    broadcaster: Broadcaster,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        gateway: Arc<dyn BatchSmsClient>,
        originator: impl Into<String>,
    ) -> Self {
        let originator = originator.into();
        Self {
            broadcaster: Broadcaster::new(gateway.clone(), originator.clone()),
            store,
            gateway,
            originator,
        }
    }

    /// Process an inbound message on a background task.
    ///
    /// The handle is only useful to tests; the webhook drops it and answers
    /// immediately.
    pub fn spawn_inbound(&self, message: InboundMessage) -> JoinHandle<Transition> {
        let service = self.clone();
        tokio::spawn(async move { service.handle_inbound(&message.from, &message.text).await })
    }

    /// Look up `number`, decide the transition for `text`, then run the store
    /// write and the confirmation concurrently. Failures are logged only.
    pub async fn handle_inbound(&self, number: &str, text: &str) -> Transition {
        let current = match self.store.find_one(number).await {
            Ok(current) => current,
            Err(e) => {
                error!(%number, error = %e, "subscriber lookup failed");
                return Transition::Ignore;
            }
        };

        let transition = decide(number, current.as_ref(), text);
        match &transition {
            Transition::Ignore => {
                debug!(%number, subscribed = ?current.map(|s| s.subscribed), "no transition");
            }
            Transition::Apply {
                write,
                notification,
            } => {
                tokio::join!(self.apply_write(write), self.notify(number, *notification));
            }
        }
        transition
    }

    async fn apply_write(&self, write: &Write) {
        let result = match write {
            Write::Insert(subscriber) => self.store.insert_one(subscriber.clone()).await,
            Write::SetSubscribed { number, subscribed } => {
                self.store.set_subscribed(number, *subscribed).await
            }
        };
        match (write, result) {
            (Write::Insert(s), Ok(())) => info!(number = %s.number, "subscribed number"),
            (Write::SetSubscribed { number, subscribed: true }, Ok(())) => {
                info!(%number, "resubscribed number")
            }
            (Write::SetSubscribed { number, subscribed: false }, Ok(())) => {
                info!(%number, "unsubscribed number")
            }
            (_, Err(e)) => error!(?write, error = %e, "subscriber write failed"),
        }
    }

    async fn notify(&self, number: &str, notification: Notification) {
        let recipients = [number.to_string()];
        let result = self
            .gateway
            .send_batch(BatchSendRequest {
                to: &recipients,
                from: &self.originator,
                text: notification.text(),
            })
            .await;
        match result {
            Ok(response) => debug!(%number, ?notification, id = %response.id, "confirmation sent"),
            Err(e) => error!(%number, ?notification, error = %e, "confirmation failed"),
        }
    }

    pub async fn active_count(&self) -> Result<usize, StoreError> {
        self.store.count_active().await
    }

    /// Send `message` to every active subscriber.
    pub async fn broadcast(&self, message: &str) -> Result<BroadcastReport, StoreError> {
        let numbers: Vec<String> = self
            .store
            .find_active()
            .await?
            .into_iter()
            .map(|s| s.number)
            .collect();
        Ok(self.broadcaster.broadcast(&numbers, message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::subscriber::Subscriber;
    use async_trait::async_trait;
    use sms_core::{SendResponse, SmsError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(Vec<String>, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl BatchSmsClient for Outbox {
        async fn send_batch(&self, req: BatchSendRequest<'_>) -> Result<SendResponse, SmsError> {
            self.sent
                .lock()
                .unwrap()
                .push((req.to.to_vec(), req.text.to_string()));
            if self.fail {
                return Err(SmsError::Auth("bad key".into()));
            }
            Ok(SendResponse {
                id: sms_core::fallback_id(),
                provider: "outbox",
                raw: serde_json::Value::Null,
            })
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SubscriberStore for BrokenStore {
        async fn find_one(&self, _number: &str) -> Result<Option<Subscriber>, StoreError> {
            Ok(None)
        }
        async fn insert_one(&self, _subscriber: Subscriber) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        async fn set_subscribed(&self, number: &str, _subscribed: bool) -> Result<(), StoreError> {
            Err(StoreError::NotFound(number.to_string()))
        }
        async fn find_active(&self) -> Result<Vec<Subscriber>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
        async fn count_active(&self) -> Result<usize, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
    }

    fn service(store: Arc<dyn SubscriberStore>, outbox: Arc<Outbox>) -> SubscriptionService {
        SubscriptionService::new(store, outbox, "SMSList")
    }

    #[tokio::test]
    async fn first_subscribe_creates_record_and_welcomes() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::default());
        let svc = service(store.clone(), outbox.clone());

        svc.handle_inbound("31611", " Subscribe ").await;

        assert_eq!(store.find_one("31611").await.unwrap(), Some(Subscriber::new("31611")));
        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["31611".to_string()]);
        assert_eq!(sent[0].1, Notification::Welcome.text());
    }

    #[tokio::test]
    async fn stop_then_subscribe_round_trip() {
        let store = Arc::new(MemoryStore::with_subscribers(vec![Subscriber::new("31611")]));
        let outbox = Arc::new(Outbox::default());
        let svc = service(store.clone(), outbox.clone());

        svc.handle_inbound("31611", "STOP").await;
        assert_eq!(store.count_active().await.unwrap(), 0);

        svc.handle_inbound("31611", "subscribe").await;
        assert_eq!(store.count_active().await.unwrap(), 1);

        let texts: Vec<String> = outbox.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(
            texts,
            vec![
                Notification::Unsubscribed.text().to_string(),
                Notification::Resubscribed.text().to_string()
            ]
        );
    }

    #[tokio::test]
    async fn repeated_subscribe_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::default());
        let svc = service(store.clone(), outbox.clone());

        svc.handle_inbound("31611", "subscribe").await;
        let second = svc.handle_inbound("31611", "subscribe").await;

        assert_eq!(second, Transition::Ignore);
        assert_eq!(store.count_active().await.unwrap(), 1);
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unrecognized_text_does_nothing() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::default());
        let svc = service(store.clone(), outbox.clone());

        assert_eq!(svc.handle_inbound("31611", "hello").await, Transition::Ignore);
        assert_eq!(svc.handle_inbound("31611", "stop").await, Transition::Ignore);
        assert_eq!(store.find_one("31611").await.unwrap(), None);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_keeps_the_store_write() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let svc = service(store.clone(), outbox);

        svc.handle_inbound("31611", "subscribe").await;
        assert_eq!(store.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn store_failure_still_notifies() {
        let outbox = Arc::new(Outbox::default());
        let svc = service(Arc::new(BrokenStore), outbox.clone());

        let transition = svc.handle_inbound("31611", "subscribe").await;
        assert!(matches!(transition, Transition::Apply { .. }));
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn spawned_inbound_completes_in_background() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::default());
        let svc = service(store.clone(), outbox);

        let message = InboundMessage {
            id: None,
            from: "31611".into(),
            to: String::new(),
            text: "subscribe".into(),
            timestamp: None,
            provider: "test",
            raw: serde_json::Value::Null,
        };
        let transition = svc.spawn_inbound(message).await.unwrap();
        assert!(matches!(transition, Transition::Apply { .. }));
        assert_eq!(store.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_only_active_subscribers() {
        let mut subscribers: Vec<Subscriber> =
            (0..60).map(|i| Subscriber::new(format!("316{:05}", i))).collect();
        subscribers[3].subscribed = false;
        let store = Arc::new(MemoryStore::with_subscribers(subscribers));
        let outbox = Arc::new(Outbox::default());
        let svc = service(store, outbox.clone());

        let report = svc.broadcast("weekly deals").await.unwrap();
        assert_eq!(report.processed, 59);
        assert_eq!(report.batches, 2);

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent[0].0.len(), 50);
        assert_eq!(sent[1].0.len(), 9);
        assert!(sent.iter().all(|(_, text)| text == "weekly deals"));
        assert!(!sent.iter().any(|(to, _)| to.contains(&"31600003".to_string())));
    }

    #[tokio::test]
    async fn broadcast_surfaces_store_errors() {
        let svc = service(Arc::new(BrokenStore), Arc::new(Outbox::default()));
        assert!(svc.broadcast("hi").await.is_err());
        assert!(svc.active_count().await.is_err());
    }
}
