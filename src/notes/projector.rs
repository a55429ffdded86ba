//! Sync projector
//!
//! Turns the store's full-collection snapshots into the ordered, numbered
//! list the note board displays. Every snapshot is projected from scratch
//! and replaces the previous view; there is no diffing.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{NoteOrdering, NotesConfig};
use crate::store::{Document, DocumentStore, StoreError};

use super::Note;

/// A note with its display ordinal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectedNote {
    /// 1-based position in creation order (oldest is 1)
    pub note_number: usize,
    pub note: Note,
}

/// Project one snapshot into the display order: numbered oldest-first,
/// then reversed so the newest note comes first.
///
/// Documents that do not decode as notes are skipped.
pub fn project(snapshot: &[Document], ordering: NoteOrdering) -> Vec<ProjectedNote> {
    let mut notes: Vec<Note> = snapshot
        .iter()
        .filter_map(|doc| match Note::from_document(doc) {
            Ok(note) => Some(note),
            Err(e) => {
                log::warn!("Skipping document in projection: {}", e);
                None
            }
        })
        .collect();

    if ordering == NoteOrdering::CreationOrder {
        // Stable, so ties keep the store's order
        notes.sort_by_key(|note| (note.created_at, note.sequence));
    }

    // Numbers count decoded notes only, so a skipped document takes no number
    let mut view: Vec<ProjectedNote> = notes
        .into_iter()
        .enumerate()
        .map(|(index, note)| ProjectedNote {
            note_number: index + 1,
            note,
        })
        .collect();
    view.reverse();
    view
}

/// Owns a live collection subscription and publishes the projected view.
///
/// The subscription is acquired in `start` and released by `stop` (or on
/// drop, once the runtime reaps the aborted task).
pub struct SyncProjector {
    view: watch::Receiver<Vec<ProjectedNote>>,
    task: Option<JoinHandle<()>>,
}

impl SyncProjector {
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        config: &NotesConfig,
    ) -> Result<Self, StoreError> {
        let mut subscription = store.subscribe_collection(&config.collection).await?;
        let (view_tx, view_rx) = watch::channel(Vec::new());
        let ordering = config.ordering;
        let collection = config.collection.clone();

        log::info!(
            "Projector subscribed to '{}' ({})",
            collection,
            subscription.id()
        );

        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next_snapshot().await {
                let view = project(&snapshot, ordering);
                log::debug!(
                    "Projected {} of {} documents from '{}'",
                    view.len(),
                    snapshot.len(),
                    collection
                );
                if view_tx.send(view).is_err() {
                    break;
                }
            }
            log::info!("Projector for '{}' finished", collection);
        });

        Ok(Self {
            view: view_rx,
            task: Some(task),
        })
    }

    /// The most recently projected view
    pub fn view(&self) -> Vec<ProjectedNote> {
        self.view.borrow().clone()
    }

    /// A receiver for observing view changes elsewhere
    pub fn watch(&self) -> watch::Receiver<Vec<ProjectedNote>> {
        self.view.clone()
    }

    /// Wait until a projected view satisfies `predicate` and return it
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<Vec<ProjectedNote>, StoreError>
    where
        F: FnMut(&[ProjectedNote]) -> bool,
    {
        loop {
            {
                let view = self.view.borrow_and_update();
                if predicate(&view) {
                    return Ok(view.clone());
                }
            }
            self.view
                .changed()
                .await
                .map_err(|_| StoreError::SubscriptionClosed)?;
        }
    }

    /// Tear down: stop processing snapshots and release the subscription
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // The task's future, and with it the subscription, is dropped
            // by the time the handle resolves
            let _ = task.await;
        }
    }
}

impl Drop for SyncProjector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
