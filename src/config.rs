//! Configuration for the notes core
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Files are plain JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How the projected note list is ordered before numbering
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoteOrdering {
    /// Use the order the store returns documents in
    StoreOrder,

    /// Stable sort by the creation timestamp and sequence written at creation
    CreationOrder,
}

/// How edits and reverts are written back to the store
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Read, append, overwrite. A concurrent writer in between is lost.
    LastWriterWins,

    /// Write only if the document version is unchanged since the read,
    /// re-reading and retrying on conflict.
    Conditional,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotesConfig {
    /// Document store collection holding the notes
    pub collection: String,

    /// Author label used when the signed-in identity has no email
    pub anonymous_label: String,

    pub ordering: NoteOrdering,

    pub write_mode: WriteMode,

    /// Attempts per edit/revert in conditional mode
    pub max_write_attempts: u32,

    /// Minimum password length accepted by the in-memory identity gateway
    pub min_password_len: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            collection: "notes".to_string(),
            anonymous_label: "Anonymous".to_string(),
            ordering: NoteOrdering::CreationOrder,
            write_mode: WriteMode::LastWriterWins,
            max_write_attempts: 3,
            min_password_len: 6,
        }
    }
}

impl NotesConfig {
    /// Parse a configuration from a JSON string and validate it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection name is empty".into()));
        }
        if self.max_write_attempts == 0 {
            return Err(ConfigError::Invalid("max_write_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// The label recorded in `createdBy`/`editedBy` for an optional email
    pub fn author_label(&self, email: Option<&str>) -> String {
        match email {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => self.anonymous_label.clone(),
        }
    }
}
