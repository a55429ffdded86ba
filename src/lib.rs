// notesync - collaborative notes with append-only revision history

pub mod auth;
pub mod config;
pub mod forms;
pub mod notes;
pub mod store;

pub use auth::identity::{Identity, IdentityError, IdentityGateway, MemoryIdentityGateway};
pub use auth::session::{GateDecision, Route, SessionGate};
pub use config::{NoteOrdering, NotesConfig, WriteMode};
pub use forms::{LoginForm, NotesBoard, RegisterForm};
pub use notes::{Note, ProjectedNote, SyncProjector};
pub use store::{DocumentStore, MemoryDocumentStore, StoreError};
