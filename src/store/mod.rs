//! Document store abstraction
//!
//! The hosted document database is an external collaborator. This module
//! defines what the notes core needs from it: point reads and writes on a
//! named collection, plus a live subscription that delivers the full
//! collection every time it changes.

mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use memory::MemoryDocumentStore;

/// Field map of a stored document
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Error types for document store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Precondition failed for {id}: expected version {expected}, found {actual}")]
    PreconditionFailed {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Subscription closed")]
    SubscriptionClosed,
}

/// A document as read from the store
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Store-assigned identifier
    pub id: String,

    /// Creation sequence, monotonic across the whole store
    pub sequence: u64,

    /// Bumped on every update; starts at 1
    pub version: u64,

    pub fields: Fields,
}

/// Condition attached to an update: apply only if the document is still
/// at this version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Precondition {
    pub version: u64,
}

/// A live view onto a collection.
///
/// Each received item is the complete current set of documents, in the
/// order the store returns them. Dropping the subscription releases it.
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<Vec<Document>>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(
        id: Uuid,
        receiver: mpsc::UnboundedReceiver<Vec<Document>>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next snapshot. `None` once the store side has gone away.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Document>> {
        self.receiver.recv().await
    }

    /// Take a snapshot that is already queued, without waiting
    pub fn try_next_snapshot(&mut self) -> Result<Option<Vec<Document>>, StoreError> {
        match self.receiver.try_recv() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(StoreError::SubscriptionClosed),
        }
    }

    /// Release the subscription now rather than at drop
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// External real-time document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to a collection. The current contents are delivered as
    /// the first snapshot.
    async fn subscribe_collection(&self, collection: &str) -> Result<Subscription, StoreError>;

    /// Create a document and return its id
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document. Fails with `NotFound` if
    /// the id is missing, or `PreconditionFailed` if a precondition is given
    /// and the version moved.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Option<Precondition>,
    ) -> Result<(), StoreError>;

    /// Remove a document permanently
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<Document>, StoreError>;
}
