//! In-process document store
//!
//! Collections keep insertion order. Every write fans out the full
//! collection to that collection's subscribers while the state lock is
//! held, so all subscribers see snapshots in write order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Document, DocumentStore, Fields, Precondition, StoreError, Subscription};

struct Subscriber {
    collection: String,
    sender: mpsc::UnboundedSender<Vec<Document>>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Vec<Document>>,
    subscribers: HashMap<Uuid, Subscriber>,
    next_sequence: u64,
    available: bool,
}

impl StoreState {
    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections.get(collection).cloned().unwrap_or_default()
    }

    fn broadcast(&mut self, collection: &str) {
        let snapshot = self.snapshot(collection);
        // Receivers that have gone away are pruned here
        self.subscribers.retain(|id, subscriber| {
            if subscriber.collection != collection {
                return true;
            }
            let delivered = subscriber.sender.send(snapshot.clone()).is_ok();
            if !delivered {
                log::debug!("Pruning closed subscription {}", id);
            }
            delivered
        });
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store is offline".into()))
        }
    }
}

/// A document store that lives entirely in this process
#[derive(Clone)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                available: true,
                next_sequence: 1,
                ..StoreState::default()
            })),
        }
    }

    /// Simulate losing or regaining the connection. While offline every
    /// call fails with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.available = available;
        }
    }

    /// Number of live subscriptions across all collections
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.subscribers.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("Failed to acquire lock".into()))
    }

    fn release_fn(state: Weak<Mutex<StoreState>>, id: Uuid) -> impl FnOnce() + Send + Sync {
        move || {
            if let Some(state) = state.upgrade() {
                if let Ok(mut state) = state.lock() {
                    if state.subscribers.remove(&id).is_some() {
                        log::debug!("Released subscription {}", id);
                    }
                }
            }
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn subscribe_collection(&self, collection: &str) -> Result<Subscription, StoreError> {
        let mut state = self.lock()?;
        state.check_available()?;

        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        // Initial snapshot; the receiver is alive so this cannot fail
        let _ = sender.send(state.snapshot(collection));
        state.subscribers.insert(
            id,
            Subscriber {
                collection: collection.to_string(),
                sender,
            },
        );

        log::debug!("Subscription {} opened on '{}'", id, collection);
        Ok(Subscription::new(
            id,
            receiver,
            Self::release_fn(Arc::downgrade(&self.state), id),
        ))
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let mut state = self.lock()?;
        state.check_available()?;

        let id = Uuid::new_v4().simple().to_string();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                sequence,
                version: 1,
                fields,
            });
        state.broadcast(collection);

        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Option<Precondition>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_available()?;

        let document = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(precondition) = precondition {
            if precondition.version != document.version {
                return Err(StoreError::PreconditionFailed {
                    id: id.to_string(),
                    expected: precondition.version,
                    actual: document.version,
                });
            }
        }

        for (key, value) in fields {
            document.fields.insert(key, value);
        }
        document.version += 1;
        state.broadcast(collection);

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_available()?;

        let removed = match state.collections.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|d| d.id != id);
                docs.len() != before
            }
            None => false,
        };

        if removed {
            state.broadcast(collection);
        } else {
            log::debug!("Delete of missing document {} in '{}'", id, collection);
        }
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let state = self.lock()?;
        state.check_available()?;

        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }
}
