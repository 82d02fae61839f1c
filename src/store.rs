//! Subscriber persistence.
//!
//! [`SubscriberStore`] is the document-store seam the rest of the crate talks
//! to. Two backends ship with the crate: [`MemoryStore`] for tests and
//! throwaway deployments, and [`JsonFileStore`] which keeps the same
//! in-memory list but snapshots it to disk after every write.
//!
//! Both keep records in insertion order, which is the order broadcasts walk.

use crate::subscriber::Subscriber;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Errors raised by subscriber stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record for this number already exists
    #[error("subscriber {0} already exists")]
    Duplicate(String),
    /// No record for this number
    #[error("subscriber {0} not found")]
    NotFound(String),
    #[error("store io error: {0}")]
    Io(#[from] io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Operations over the `subscribers` collection, keyed by phone number.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_one(&self, number: &str) -> Result<Option<Subscriber>, StoreError>;

    /// Insert a new record; fails with [`StoreError::Duplicate`] if the number is taken.
    async fn insert_one(&self, subscriber: Subscriber) -> Result<(), StoreError>;

    /// Set the `subscribed` flag of an existing record.
    async fn set_subscribed(&self, number: &str, subscribed: bool) -> Result<(), StoreError>;

    /// All records with `subscribed == true`, in store order.
    async fn find_active(&self) -> Result<Vec<Subscriber>, StoreError>;

    async fn count_active(&self) -> Result<usize, StoreError>;
}

/// Insertion-ordered record list shared by both backends.
#[derive(Debug, Default)]
struct Records {
    items: Vec<Subscriber>,
}

impl Records {
    fn find(&self, number: &str) -> Option<&Subscriber> {
        self.items.iter().find(|s| s.number == number)
    }

    fn insert(&mut self, subscriber: Subscriber) -> Result<(), StoreError> {
        if self.find(&subscriber.number).is_some() {
            return Err(StoreError::Duplicate(subscriber.number));
        }
        self.items.push(subscriber);
        Ok(())
    }

    fn set_subscribed(&mut self, number: &str, subscribed: bool) -> Result<(), StoreError> {
        let record = self
            .items
            .iter_mut()
            .find(|s| s.number == number)
            .ok_or_else(|| StoreError::NotFound(number.to_string()))?;
        record.subscribed = subscribed;
        Ok(())
    }

    fn active(&self) -> Vec<Subscriber> {
        self.items.iter().filter(|s| s.subscribed).cloned().collect()
    }

    fn count_active(&self) -> usize {
        self.items.iter().filter(|s| s.subscribed).count()
    }
}

/// Volatile store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `subscribers`, in order.
    pub fn with_subscribers(subscribers: Vec<Subscriber>) -> Self {
        Self {
            records: RwLock::new(Records { items: subscribers }),
        }
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn find_one(&self, number: &str) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.records.read().await.find(number).cloned())
    }

    async fn insert_one(&self, subscriber: Subscriber) -> Result<(), StoreError> {
        self.records.write().await.insert(subscriber)
    }

    async fn set_subscribed(&self, number: &str, subscribed: bool) -> Result<(), StoreError> {
        self.records.write().await.set_subscribed(number, subscribed)
    }

    async fn find_active(&self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self.records.read().await.active())
    }

    async fn count_active(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.count_active())
    }
}

/// Store persisted as a JSON array of subscriber records.
///
/// Every successful write rewrites the whole file through a temporary
/// sibling and a rename, while holding the write lock, so the file always
/// reflects a complete list.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<Records>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let items = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<Subscriber>>(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), records = items.len(), "opened subscriber file");
        Ok(Self {
            path,
            records: RwLock::new(Records { items }),
        })
    }

    async fn persist(&self, records: &Records) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&records.items)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for JsonFileStore {
    async fn find_one(&self, number: &str) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.records.read().await.find(number).cloned())
    }

    async fn insert_one(&self, subscriber: Subscriber) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let number = subscriber.number.clone();
        records.insert(subscriber)?;
        if let Err(e) = self.persist(&records).await {
            // Keep memory and disk in agreement.
            records.items.retain(|s| s.number != number);
            return Err(e);
        }
        Ok(())
    }

    async fn set_subscribed(&self, number: &str, subscribed: bool) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let previous = records
            .find(number)
            .map(|s| s.subscribed)
            .ok_or_else(|| StoreError::NotFound(number.to_string()))?;
        records.set_subscribed(number, subscribed)?;
        if let Err(e) = self.persist(&records).await {
            records.set_subscribed(number, previous)?;
            return Err(e);
        }
        Ok(())
    }

    async fn find_active(&self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self.records.read().await.active())
    }

    async fn count_active(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.count_active())
    }
}
