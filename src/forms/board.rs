//! The note board
//!
//! Mounting the board acquires the live collection subscription; unmounting
//! releases it. Every write-triggering command marks the board busy until
//! its store call settles, whether it succeeded or not.

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::identity::IdentityGateway;
use crate::auth::session::{Route, SessionGate};
use crate::config::{NotesConfig, WriteMode};
use crate::notes::revision::{self, UpdatedState};
use crate::notes::{Note, ProjectedNote, RevisionError, SyncProjector};
use crate::store::{DocumentStore, Precondition, StoreError};

use super::{CommandError, LoadingFlag};

/// The edit dialog's state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditDraft {
    pub note_id: String,
    pub content: String,
}

/// A revert waiting for the user to confirm it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRevert {
    pub note_id: String,
    pub content: String,
}

pub struct NotesBoard {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityGateway>,
    config: NotesConfig,
    projector: SyncProjector,
    loading: LoadingFlag,
    new_note: String,
    editing: Option<EditDraft>,
    open_history: Option<String>,
    history: HashMap<String, Vec<String>>,
    pending_revert: Option<PendingRevert>,
}

impl NotesBoard {
    /// Open the board for the signed-in identity and start following the
    /// notes collection
    pub async fn mount(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityGateway>,
        config: NotesConfig,
    ) -> Result<Self, CommandError> {
        if !SessionGate::is_authorized(identity.current_identity().as_ref()) {
            return Err(CommandError::NotSignedIn);
        }

        let projector = SyncProjector::start(store.clone(), &config).await?;

        Ok(Self {
            store,
            identity,
            config,
            projector,
            loading: LoadingFlag::new(),
            new_note: String::new(),
            editing: None,
            open_history: None,
            history: HashMap::new(),
            pending_revert: None,
        })
    }

    /// Tear the board down and release the collection subscription
    pub async fn unmount(self) {
        self.projector.stop().await;
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_busy()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Current projected notes, newest first
    pub fn notes(&self) -> Vec<ProjectedNote> {
        self.projector.view()
    }

    /// Wait until the projected notes satisfy `predicate`
    pub async fn wait_for_notes<F>(&mut self, predicate: F) -> Result<Vec<ProjectedNote>, CommandError>
    where
        F: FnMut(&[ProjectedNote]) -> bool,
    {
        Ok(self.projector.wait_for(predicate).await?)
    }

    // ---------------------------------------------------------------------
    // Adding and deleting
    // ---------------------------------------------------------------------

    pub fn set_new_note(&mut self, content: impl Into<String>) {
        self.new_note = content.into();
    }

    pub fn new_note(&self) -> &str {
        &self.new_note
    }

    /// Create a note from the draft. A blank draft is not submitted and
    /// yields `Ok(None)`.
    pub async fn add_note(&mut self) -> Result<Option<String>, CommandError> {
        if self.new_note.trim().is_empty() {
            return Ok(None);
        }
        let author = self.author()?;
        let state = match revision::create(&self.new_note, &author) {
            Ok(state) => state,
            Err(RevisionError::EmptyContent) => return Ok(None),
        };
        let fields = state.to_fields()?;

        let _busy = self.loading.begin();
        let id = self
            .store
            .add_document(&self.config.collection, fields)
            .await
            .map_err(|e| self.store_failure("add", e))?;

        log::info!("Created note {}", id);
        self.new_note.clear();
        Ok(Some(id))
    }

    pub async fn delete_note(&mut self, note_id: &str) -> Result<(), CommandError> {
        let _busy = self.loading.begin();
        self.store
            .delete_document(&self.config.collection, note_id)
            .await
            .map_err(|e| self.store_failure("delete", e))?;

        log::info!("Deleted note {}", note_id);
        self.history.remove(note_id);
        if self.open_history.as_deref() == Some(note_id) {
            self.open_history = None;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------------

    /// Open the edit dialog with the note's current content
    pub fn begin_edit(&mut self, note_id: impl Into<String>, content: impl Into<String>) {
        self.editing = Some(EditDraft {
            note_id: note_id.into(),
            content: content.into(),
        });
    }

    pub fn edit_draft(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    pub fn set_edit_content(&mut self, content: impl Into<String>) -> Result<(), CommandError> {
        let draft = self.editing.as_mut().ok_or(CommandError::NoActiveEdit)?;
        draft.content = content.into();
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Save the edit dialog. Blank content is not submitted: the dialog
    /// stays open and `Ok(false)` is returned.
    pub async fn save_edit(&mut self) -> Result<bool, CommandError> {
        let draft = self.editing.clone().ok_or(CommandError::NoActiveEdit)?;
        if draft.content.trim().is_empty() {
            return Ok(false);
        }

        let _busy = self.loading.begin();
        let updated = self
            .write_revision(&draft.note_id, |history, editor| {
                revision::edit(history, &draft.content, editor)
            })
            .await?;

        self.refresh_open_history(&draft.note_id, &updated);
        self.editing = None;
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // History and revert
    // ---------------------------------------------------------------------

    /// Open the history panel for a note, closing it if it is already open.
    /// Opening reads the note fresh from the store.
    pub async fn toggle_history(&mut self, note_id: &str) -> Result<(), CommandError> {
        if self.open_history.as_deref() == Some(note_id) {
            self.open_history = None;
            return Ok(());
        }

        self.open_history = Some(note_id.to_string());
        let note = self.read_note(note_id).await?;
        self.history
            .insert(note.id.clone(), note.previous_versions().to_vec());
        Ok(())
    }

    pub fn open_history(&self) -> Option<&str> {
        self.open_history.as_deref()
    }

    /// Previous versions loaded for a note, oldest first
    pub fn history(&self, note_id: &str) -> Option<&[String]> {
        self.history.get(note_id).map(Vec::as_slice)
    }

    /// Ask for confirmation before reverting a note to `content`
    pub fn request_revert(&mut self, note_id: impl Into<String>, content: impl Into<String>) {
        self.pending_revert = Some(PendingRevert {
            note_id: note_id.into(),
            content: content.into(),
        });
    }

    pub fn pending_revert(&self) -> Option<&PendingRevert> {
        self.pending_revert.as_ref()
    }

    pub fn cancel_revert(&mut self) {
        self.pending_revert = None;
    }

    pub async fn confirm_revert(&mut self) -> Result<(), CommandError> {
        let pending = self
            .pending_revert
            .clone()
            .ok_or(CommandError::NoPendingRevert)?;

        let _busy = self.loading.begin();
        let updated = self
            .write_revision(&pending.note_id, |history, editor| {
                Ok(revision::revert(history, &pending.content, editor))
            })
            .await?;

        self.refresh_open_history(&pending.note_id, &updated);
        self.pending_revert = None;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Session
    // ---------------------------------------------------------------------

    /// Sign out. Returns where to navigate on success; a failure is logged
    /// and leaves the user on the board.
    pub async fn logout(&mut self) -> Option<Route> {
        let _busy = self.loading.begin();
        match self.identity.logout().await {
            Ok(()) => Some(Route::Landing),
            Err(e) => {
                log::error!("Logout error: {}", e);
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn author(&self) -> Result<String, CommandError> {
        let identity = self
            .identity
            .current_identity()
            .ok_or(CommandError::NotSignedIn)?;
        Ok(self.config.author_label(identity.email.as_deref()))
    }

    fn store_failure(&self, action: &str, error: StoreError) -> CommandError {
        log::error!("Failed to {} note: {}", action, error);
        CommandError::Store(error)
    }

    async fn read_note(&self, note_id: &str) -> Result<Note, CommandError> {
        let document = self
            .store
            .get_document(&self.config.collection, note_id)
            .await
            .map_err(|e| self.store_failure("read", e))?
            .ok_or_else(|| StoreError::NotFound(note_id.to_string()))?;
        Ok(Note::from_document(&document)?)
    }

    /// Read the note, compute its next state from the fresh history, and
    /// write it back.
    ///
    /// With `WriteMode::LastWriterWins` a concurrent write between the read
    /// and the write is overwritten. With `WriteMode::Conditional` the write
    /// carries the read version and is retried from a fresh read on conflict.
    async fn write_revision<F>(&self, note_id: &str, compute: F) -> Result<UpdatedState, CommandError>
    where
        F: Fn(&[String], &str) -> Result<UpdatedState, RevisionError>,
    {
        let editor = self.author()?;
        let attempts = match self.config.write_mode {
            WriteMode::LastWriterWins => 1,
            WriteMode::Conditional => self.config.max_write_attempts.max(1),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let note = self.read_note(note_id).await?;
            let updated = compute(&note.content_history, &editor)?;
            let precondition = match self.config.write_mode {
                WriteMode::LastWriterWins => None,
                WriteMode::Conditional => Some(Precondition {
                    version: note.version,
                }),
            };

            match self
                .store
                .update_document(
                    &self.config.collection,
                    note_id,
                    updated.to_fields()?,
                    precondition,
                )
                .await
            {
                Ok(()) => {
                    log::info!(
                        "Note {} now has {} versions",
                        note_id,
                        updated.content_history.len()
                    );
                    return Ok(updated);
                }
                Err(StoreError::PreconditionFailed { actual, .. }) if attempt < attempts => {
                    log::warn!(
                        "Note {} moved to version {} during write, retrying ({}/{})",
                        note_id,
                        actual,
                        attempt,
                        attempts
                    );
                }
                Err(StoreError::PreconditionFailed { .. }) => {
                    return Err(CommandError::Conflict {
                        id: note_id.to_string(),
                        attempts,
                    });
                }
                Err(e) => return Err(self.store_failure("update", e)),
            }
        }
    }

    fn refresh_open_history(&mut self, note_id: &str, updated: &UpdatedState) {
        if self.open_history.as_deref() == Some(note_id) {
            self.history.insert(
                note_id.to_string(),
                revision::history_for_display(&updated.content_history).to_vec(),
            );
        }
    }
}
