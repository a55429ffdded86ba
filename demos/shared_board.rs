//! Two users sharing one notes board
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example shared_board [config.json]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use notesync::{
    DocumentStore, GateDecision, IdentityGateway, MemoryDocumentStore, MemoryIdentityGateway,
    NotesBoard, NotesConfig, RegisterForm, Route, SessionGate,
};

async fn sign_up(email: &str, config: &NotesConfig) -> Result<Arc<MemoryIdentityGateway>> {
    let gateway = Arc::new(MemoryIdentityGateway::new(config.min_password_len));
    let mut form = RegisterForm::new(gateway.clone());
    form.set_email(email);
    form.set_password("correct horse battery");

    match form.submit().await {
        Some(route) => {
            println!("{} -> {} ({})", email, route.path(), form.message().unwrap_or(""));
            Ok(gateway)
        }
        None => Err(anyhow!(
            "registration of {} failed: {}",
            email,
            form.message().unwrap_or("unknown")
        )),
    }
}

fn print_board(title: &str, board: &NotesBoard) {
    println!("--- {} ---", title);
    for projected in board.notes() {
        let note = &projected.note;
        println!("Note #{}: {}", projected.note_number, note.content);
        println!("  Created by: {}", note.created_by);
        if let Some(editor) = &note.edited_by {
            println!("  Edited last by: {}", editor);
        }
        for previous in note.previous_versions() {
            println!("  previous: {}", previous);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => NotesConfig::load(&PathBuf::from(&path))
            .with_context(|| format!("loading config from {}", path))?,
        None => NotesConfig::default(),
    };

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());

    let alice = sign_up("alice@example.com", &config).await?;
    let bob = sign_up("bob@example.com", &config).await?;

    let gate = SessionGate::new(alice.clone());
    if gate.check(Route::Notes) != GateDecision::Allow {
        return Err(anyhow!("alice cannot reach {}", Route::Notes.path()));
    }

    let mut alice_board = NotesBoard::mount(store.clone(), alice.clone(), config.clone()).await?;
    let mut bob_board = NotesBoard::mount(store.clone(), bob.clone(), config.clone()).await?;

    alice_board.set_new_note("Buy milk");
    let milk = alice_board
        .add_note()
        .await?
        .ok_or_else(|| anyhow!("note was blank"))?;
    alice_board.set_new_note("Call the plumber");
    alice_board.add_note().await?;

    bob_board.wait_for_notes(|notes| notes.len() == 2).await?;
    bob_board.begin_edit(milk.clone(), "Buy milk");
    bob_board.set_edit_content("Buy oat milk")?;
    bob_board.save_edit().await?;

    alice_board.toggle_history(&milk).await?;
    if let Some(previous) = alice_board.history(&milk).and_then(|h| h.first()).cloned() {
        alice_board.request_revert(milk.clone(), previous);
        alice_board.confirm_revert().await?;
    }

    bob_board
        .wait_for_notes(|notes| notes.iter().any(|p| p.note.content_history.len() == 3))
        .await?;
    print_board("bob's view", &bob_board);

    if let Some(route) = alice_board.logout().await {
        println!("alice -> {}", route.path());
    }
    println!("alice signed in: {}", alice.current_identity().is_some());

    alice_board.unmount().await;
    bob_board.unmount().await;
    Ok(())
}
