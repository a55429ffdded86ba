//! Revision engine
//!
//! Computes the next content/history pair of a note. History only ever
//! grows: an edit appends the new content, and a revert appends the old
//! content again rather than truncating. The engine keeps no state of its
//! own; callers pass in a freshly read history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::store::Fields;

use super::{to_fields, NoteError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevisionError {
    #[error("Note content is empty")]
    EmptyContent,
}

/// Fields of a newly created note
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewNoteState {
    pub content: String,
    pub content_history: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl NewNoteState {
    pub fn to_fields(&self) -> Result<Fields, NoteError> {
        to_fields(self)
    }
}

/// Fields written by an edit or a revert
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedState {
    pub content: String,
    pub content_history: Vec<String>,
    pub edited_by: String,
}

impl UpdatedState {
    pub fn to_fields(&self) -> Result<Fields, NoteError> {
        to_fields(self)
    }
}

fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

/// State of a new note. The history is seeded with the initial content.
pub fn create(initial_content: &str, author: &str) -> Result<NewNoteState, RevisionError> {
    if is_blank(initial_content) {
        return Err(RevisionError::EmptyContent);
    }

    Ok(NewNoteState {
        content: initial_content.to_string(),
        content_history: vec![initial_content.to_string()],
        created_by: author.to_string(),
        created_at: Utc::now(),
    })
}

/// Append `new_content` to the current history
pub fn edit(
    current_history: &[String],
    new_content: &str,
    editor: &str,
) -> Result<UpdatedState, RevisionError> {
    if is_blank(new_content) {
        return Err(RevisionError::EmptyContent);
    }

    Ok(append(current_history, new_content, editor))
}

/// Make `target` current again by appending it. Nothing is removed.
pub fn revert(current_history: &[String], target: &str, editor: &str) -> UpdatedState {
    append(current_history, target, editor)
}

/// Every history entry except the last, which is the current content
pub fn history_for_display(content_history: &[String]) -> &[String] {
    match content_history.split_last() {
        Some((_, previous)) => previous,
        None => &[],
    }
}

fn append(current_history: &[String], content: &str, editor: &str) -> UpdatedState {
    let mut content_history = Vec::with_capacity(current_history.len() + 1);
    content_history.extend_from_slice(current_history);
    content_history.push(content.to_string());

    UpdatedState {
        content: content.to_string(),
        content_history,
        edited_by: editor.to_string(),
    }
}
