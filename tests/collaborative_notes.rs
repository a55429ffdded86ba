//! Shared-board integration test
//!
//! Several users work on one notes collection through their own boards,
//! each with its own identity session, all backed by one in-memory store.
//!
//! Run with:
//!   cargo test --test collaborative_notes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use notesync::forms::CommandError;
use notesync::notes::revision;
use notesync::store::{Document, Fields, Precondition, Subscription};
use notesync::{
    DocumentStore, GateDecision, IdentityGateway, LoginForm, MemoryDocumentStore,
    MemoryIdentityGateway, Note, NotesBoard, NotesConfig, RegisterForm, Route, SessionGate,
    StoreError, WriteMode,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user(email: &str) -> Arc<MemoryIdentityGateway> {
    let gateway = Arc::new(MemoryIdentityGateway::default());
    let mut form = RegisterForm::new(gateway.clone());
    form.set_email(email);
    form.set_password("correct horse");
    assert_eq!(form.submit().await, Some(Route::Notes));
    gateway
}

async fn board(
    store: &Arc<dyn DocumentStore>,
    gateway: Arc<MemoryIdentityGateway>,
    config: &NotesConfig,
) -> NotesBoard {
    NotesBoard::mount(store.clone(), gateway, config.clone())
        .await
        .unwrap()
}

async fn read_note(store: &Arc<dyn DocumentStore>, id: &str) -> Note {
    let doc = store.get_document("notes", id).await.unwrap().unwrap();
    Note::from_document(&doc).unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Wraps a store and lands one foreign edit between the first read and
/// the first write of a note, as another client would.
struct RacingStore {
    inner: MemoryDocumentStore,
    raced: AtomicBool,
}

impl RacingStore {
    fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            raced: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DocumentStore for RacingStore {
    async fn subscribe_collection(&self, collection: &str) -> Result<Subscription, StoreError> {
        self.inner.subscribe_collection(collection).await
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.inner.add_document(collection, fields).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Option<Precondition>,
    ) -> Result<(), StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let doc = self.inner.get_document(collection, id).await?.unwrap();
            let note = Note::from_document(&doc).unwrap();
            let foreign = revision::edit(&note.content_history, "from elsewhere", "zed@example.com")
                .unwrap()
                .to_fields()
                .unwrap();
            self.inner.update_document(collection, id, foreign, None).await?;
        }
        self.inner
            .update_document(collection, id, fields, precondition)
            .await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(collection, id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_edit_revert_across_users() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let config = NotesConfig::default();

    let mut alice = board(&store, user("alice@example.com").await, &config).await;
    let mut bob = board(&store, user("bob@example.com").await, &config).await;
    let mut carol = board(&store, user("carol@example.com").await, &config).await;

    // Alice creates
    alice.set_new_note("Buy milk");
    let id = alice.add_note().await.unwrap().unwrap();

    let note = read_note(&store, &id).await;
    assert_eq!(note.content, "Buy milk");
    assert_eq!(note.content_history, strings(&["Buy milk"]));
    assert_eq!(note.created_by, "alice@example.com");
    assert_eq!(note.edited_by, None);

    // Bob sees it live and edits
    let seen = bob.wait_for_notes(|notes| notes.len() == 1).await.unwrap();
    assert_eq!(seen[0].note.content, "Buy milk");
    bob.begin_edit(id.clone(), seen[0].note.content.clone());
    bob.set_edit_content("Buy oat milk").unwrap();
    assert!(bob.save_edit().await.unwrap());

    let note = read_note(&store, &id).await;
    assert_eq!(note.content, "Buy oat milk");
    assert_eq!(note.content_history, strings(&["Buy milk", "Buy oat milk"]));
    assert_eq!(note.created_by, "alice@example.com");
    assert_eq!(note.edited_by.as_deref(), Some("bob@example.com"));

    // Carol opens the history and reverts
    carol
        .wait_for_notes(|notes| notes.first().map(|p| p.note.content.as_str()) == Some("Buy oat milk"))
        .await
        .unwrap();
    carol.toggle_history(&id).await.unwrap();
    let previous = carol.history(&id).unwrap().to_vec();
    assert_eq!(previous, strings(&["Buy milk"]));

    carol.request_revert(id.clone(), previous[0].clone());
    carol.confirm_revert().await.unwrap();

    let note = read_note(&store, &id).await;
    assert_eq!(note.content, "Buy milk");
    assert_eq!(
        note.content_history,
        strings(&["Buy milk", "Buy oat milk", "Buy milk"])
    );
    assert_eq!(note.edited_by.as_deref(), Some("carol@example.com"));

    // Everyone converges on the same view
    for participant in [&mut alice, &mut bob, &mut carol] {
        let view = participant
            .wait_for_notes(|notes| notes.first().map(|p| p.note.content_history.len()) == Some(3))
            .await
            .unwrap();
        assert_eq!(view[0].note_number, 1);
    }

    alice.unmount().await;
    bob.unmount().await;
    carol.unmount().await;
}

#[tokio::test]
async fn test_newest_note_first_with_native_numbers() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let config = NotesConfig::default();
    let mut alice = board(&store, user("alice@example.com").await, &config).await;

    let mut ids = Vec::new();
    for content in ["A", "B", "C"] {
        alice.set_new_note(content);
        ids.push(alice.add_note().await.unwrap().unwrap());
    }

    let view = alice.wait_for_notes(|notes| notes.len() == 3).await.unwrap();
    let shown: Vec<(String, usize)> = view
        .iter()
        .map(|p| (p.note.content.clone(), p.note_number))
        .collect();
    assert_eq!(
        shown,
        vec![("C".to_string(), 3), ("B".to_string(), 2), ("A".to_string(), 1)]
    );

    // Deleting renumbers on the next snapshot
    alice.delete_note(&ids[0]).await.unwrap();
    let view = alice.wait_for_notes(|notes| notes.len() == 2).await.unwrap();
    assert_eq!(view[0].note.content, "C");
    assert_eq!(view[0].note_number, 2);
    assert_eq!(view[1].note_number, 1);
}

#[tokio::test]
async fn test_last_writer_wins_drops_concurrent_edit() {
    let racing = Arc::new(RacingStore::new(MemoryDocumentStore::new()));
    let store: Arc<dyn DocumentStore> = racing.clone();
    let config = NotesConfig::default();
    assert_eq!(config.write_mode, WriteMode::LastWriterWins);

    let mut bob = board(&store, user("bob@example.com").await, &config).await;
    bob.set_new_note("v1");
    let id = bob.add_note().await.unwrap().unwrap();

    bob.begin_edit(id.clone(), "v1");
    bob.set_edit_content("v2").unwrap();
    assert!(bob.save_edit().await.unwrap());

    // The foreign edit landed, then was overwritten by Bob's stale history
    let note = read_note(&store, &id).await;
    assert_eq!(note.content_history, strings(&["v1", "v2"]));
    assert_eq!(note.version, 3);
}

#[tokio::test]
async fn test_conditional_writes_keep_concurrent_edit() {
    let racing = Arc::new(RacingStore::new(MemoryDocumentStore::new()));
    let store: Arc<dyn DocumentStore> = racing.clone();
    let config = NotesConfig {
        write_mode: WriteMode::Conditional,
        ..NotesConfig::default()
    };

    let mut bob = board(&store, user("bob@example.com").await, &config).await;
    bob.set_new_note("v1");
    let id = bob.add_note().await.unwrap().unwrap();

    bob.begin_edit(id.clone(), "v1");
    bob.set_edit_content("v2").unwrap();
    assert!(bob.save_edit().await.unwrap());

    let note = read_note(&store, &id).await;
    assert_eq!(note.content_history, strings(&["v1", "from elsewhere", "v2"]));
    assert_eq!(note.content, "v2");
    assert_eq!(note.edited_by.as_deref(), Some("bob@example.com"));
}

#[tokio::test]
async fn test_conditional_writes_give_up_after_attempts() {
    let racing = Arc::new(RacingStore::new(MemoryDocumentStore::new()));
    let store: Arc<dyn DocumentStore> = racing.clone();
    let config = NotesConfig {
        write_mode: WriteMode::Conditional,
        max_write_attempts: 1,
        ..NotesConfig::default()
    };

    let mut bob = board(&store, user("bob@example.com").await, &config).await;
    bob.set_new_note("v1");
    let id = bob.add_note().await.unwrap().unwrap();

    bob.begin_edit(id.clone(), "v1");
    bob.set_edit_content("v2").unwrap();
    assert_eq!(
        bob.save_edit().await,
        Err(CommandError::Conflict { id: id.clone(), attempts: 1 })
    );
    assert!(!bob.is_loading());
    assert!(bob.edit_draft().is_some());
}

#[tokio::test]
async fn test_session_gate_and_login_round_trip() {
    let gateway = user("alice@example.com").await;
    let gate = SessionGate::new(gateway.clone());
    assert_eq!(gate.check(Route::Notes), GateDecision::Allow);

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let mut alice = board(&store, gateway.clone(), &NotesConfig::default()).await;
    assert_eq!(alice.logout().await, Some(Route::Landing));
    alice.unmount().await;

    assert_eq!(gate.check(Route::Notes), GateDecision::Redirect(Route::Login));
    assert!(NotesBoard::mount(store.clone(), gateway.clone(), NotesConfig::default())
        .await
        .is_err());

    let mut login = LoginForm::new(gateway.clone());
    login.set_email("alice@example.com");
    login.set_password("correct horse");
    assert_eq!(login.submit().await, Some(Route::Notes));
    assert_eq!(gate.check(Route::Notes), GateDecision::Allow);
    assert!(gateway.current_identity().is_some());
}

#[tokio::test]
async fn test_foreign_documents_do_not_break_the_view() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let serde_json::Value::Object(junk) = json!({"title": "not a note"}) else {
        unreachable!()
    };
    store.add_document("notes", junk).await.unwrap();

    let mut alice = board(&store, user("alice@example.com").await, &NotesConfig::default()).await;
    alice.set_new_note("real");
    alice.add_note().await.unwrap();

    let view = alice.wait_for_notes(|notes| notes.len() == 1).await.unwrap();
    assert_eq!(view[0].note.content, "real");
    assert_eq!(view[0].note_number, 1);
}
