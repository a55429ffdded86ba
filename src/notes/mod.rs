//! Notes: the stored entity, its revision history, and the live list view
//!
//! The document store is the source of truth. A `Note` is only ever a
//! decoded copy of a stored document; the revision engine computes the
//! next state from such a copy and hands back the fields to write.

pub mod projector;
pub mod revision;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Document, Fields};

pub use projector::{project, ProjectedNote, SyncProjector};
pub use revision::{NewNoteState, RevisionError, UpdatedState};

/// Error types for note decoding and encoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("Note {id} could not be decoded: {reason}")]
    Decode { id: String, reason: String },

    #[error("Note {0} has an empty content history")]
    EmptyHistory(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persisted field layout of a note document
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredNote {
    content: String,
    content_history: Vec<String>,
    created_by: String,
    #[serde(default)]
    edited_by: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// A note as read from the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: String,

    /// Store version at read time, used for conditional writes
    pub version: u64,

    /// Store-assigned creation sequence
    pub sequence: u64,

    pub content: String,

    /// Append-only. Index 0 is the original content.
    pub content_history: Vec<String>,

    pub created_by: String,

    /// Absent until the first edit or revert
    pub edited_by: Option<String>,

    /// Missing on documents written before timestamps were recorded
    pub created_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn from_document(document: &Document) -> Result<Self, NoteError> {
        let stored: StoredNote =
            serde_json::from_value(serde_json::Value::Object(document.fields.clone())).map_err(
                |e| NoteError::Decode {
                    id: document.id.clone(),
                    reason: e.to_string(),
                },
            )?;

        if stored.content_history.is_empty() {
            return Err(NoteError::EmptyHistory(document.id.clone()));
        }

        Ok(Self {
            id: document.id.clone(),
            version: document.version,
            sequence: document.sequence,
            content: stored.content,
            content_history: stored.content_history,
            created_by: stored.created_by,
            edited_by: stored.edited_by,
            created_at: stored.created_at,
        })
    }

    /// Previous versions, oldest first, excluding the current content
    pub fn previous_versions(&self) -> &[String] {
        revision::history_for_display(&self.content_history)
    }
}

/// Serialize a state struct into a store field map
pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Fields, NoteError> {
    match serde_json::to_value(value).map_err(|e| NoteError::Serialization(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(NoteError::Serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(id: &str, value: serde_json::Value) -> Document {
        let serde_json::Value::Object(fields) = value else {
            panic!("expected an object");
        };
        Document {
            id: id.to_string(),
            sequence: 7,
            version: 3,
            fields,
        }
    }

    #[test]
    fn test_decode_stored_note() {
        let doc = document(
            "n1",
            json!({
                "content": "Buy oat milk",
                "contentHistory": ["Buy milk", "Buy oat milk"],
                "createdBy": "alice@example.com",
                "editedBy": "bob@example.com",
            }),
        );

        let note = Note::from_document(&doc).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.version, 3);
        assert_eq!(note.sequence, 7);
        assert_eq!(note.edited_by.as_deref(), Some("bob@example.com"));
        assert_eq!(note.created_at, None);
        assert_eq!(note.previous_versions(), &["Buy milk".to_string()]);
    }

    #[test]
    fn test_decode_rejects_malformed_documents() {
        let missing = document("n2", json!({"content": "x", "createdBy": "a"}));
        assert!(matches!(Note::from_document(&missing), Err(NoteError::Decode { .. })));

        let empty = document(
            "n3",
            json!({"content": "x", "contentHistory": [], "createdBy": "a"}),
        );
        assert_eq!(
            Note::from_document(&empty),
            Err(NoteError::EmptyHistory("n3".into()))
        );
    }
}
