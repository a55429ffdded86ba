//! Identity management for the notes core
//!
//! Registration, login and logout are delegated to an external identity
//! provider behind the `IdentityGateway` trait. Failures come back as a
//! closed `IdentityError` so callers match them exhaustively.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryIdentityGateway;

/// Error types for identity operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Weak password")]
    WeakPassword,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Identity provider error: {0}")]
    Other(String),
}

impl IdentityError {
    /// Message shown on the registration form for this failure
    pub fn register_message(&self) -> &'static str {
        match self {
            IdentityError::EmailAlreadyInUse => {
                "This email is already in use. Please use a different email."
            }
            IdentityError::InvalidEmail => "Invalid email address. Please check your email.",
            IdentityError::WeakPassword => {
                "Password is too weak. Please choose a stronger password."
            }
            IdentityError::InvalidCredentials | IdentityError::Other(_) => {
                "Registration failed. Please try again."
            }
        }
    }

    /// Message shown on the login form for this failure
    pub fn login_message(&self) -> &'static str {
        match self {
            IdentityError::InvalidEmail => "Invalid email address. Please check your email.",
            IdentityError::EmailAlreadyInUse
            | IdentityError::WeakPassword
            | IdentityError::InvalidCredentials
            | IdentityError::Other(_) => "Login failed. Please check your credentials.",
        }
    }
}

/// A signed-in user as reported by the identity provider
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned user id
    pub id: Uuid,

    /// Email address, if the provider exposes one
    pub email: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: Some(email.into()),
        }
    }

    /// An identity without an email (anonymous sign-in)
    pub fn anonymous() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: None,
        }
    }
}

/// External identity provider
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Create an account and sign it in
    async fn register(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Sign in to an existing account
    async fn login(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Sign out the current identity
    async fn logout(&self) -> Result<(), IdentityError>;

    /// The currently signed-in identity, if any
    fn current_identity(&self) -> Option<Identity>;
}
