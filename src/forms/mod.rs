//! Form/command layer
//!
//! Translates user actions into identity, revision and store calls, and
//! keeps the transient state a presentation layer renders: the loading
//! flag, the note being edited, the open history panel, the pending
//! revert confirmation and the form messages.

mod account;
mod board;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::notes::{NoteError, RevisionError};
use crate::store::StoreError;

pub use account::{LoginForm, RegisterForm};
pub use board::{EditDraft, NotesBoard, PendingRevert};

/// Error types for board commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("No identity is signed in")]
    NotSignedIn,

    #[error("No note is being edited")]
    NoActiveEdit,

    #[error("No revert is awaiting confirmation")]
    NoPendingRevert,

    #[error("Gave up writing note {id} after {attempts} conflicting attempts")]
    Conflict { id: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Note(#[from] NoteError),

    #[error(transparent)]
    Revision(#[from] RevisionError),
}

/// Loading flag shared with whatever renders the busy state
#[derive(Clone, Debug, Default)]
pub struct LoadingFlag {
    busy: Arc<AtomicBool>,
}

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Mark busy until the returned guard is dropped
    pub fn begin(&self) -> BusyGuard {
        self.busy.store(true, Ordering::SeqCst);
        BusyGuard {
            busy: self.busy.clone(),
        }
    }
}

/// Returns the loading flag to idle when dropped, on every exit path
#[must_use = "the flag goes idle as soon as the guard is dropped"]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
