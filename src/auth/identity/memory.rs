//! In-process identity provider
//!
//! Keeps accounts in memory keyed by normalized email. Passwords are never
//! stored, only a salted SHA-256 digest.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{Identity, IdentityError, IdentityGateway};

struct Account {
    id: Uuid,
    email: String,
    salt: String,
    digest: String,
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Rough syntactic check: `local@domain.tld`, no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// An identity gateway that lives entirely in this process
pub struct MemoryIdentityGateway {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Identity>>,
    min_password_len: usize,
}

impl MemoryIdentityGateway {
    pub fn new(min_password_len: usize) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            min_password_len,
        }
    }

    fn set_current(&self, identity: Option<Identity>) -> Result<(), IdentityError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| IdentityError::Other("Failed to acquire lock".into()))?;
        *current = identity;
        Ok(())
    }
}

impl Default for MemoryIdentityGateway {
    fn default() -> Self {
        Self::new(6)
    }
}

#[async_trait]
impl IdentityGateway for MemoryIdentityGateway {
    async fn register(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(IdentityError::InvalidEmail);
        }
        if password.chars().count() < self.min_password_len {
            return Err(IdentityError::WeakPassword);
        }

        let identity = {
            let mut accounts = self
                .accounts
                .lock()
                .map_err(|_| IdentityError::Other("Failed to acquire lock".into()))?;

            let key = normalize_email(email);
            if accounts.contains_key(&key) {
                return Err(IdentityError::EmailAlreadyInUse);
            }

            let salt = Uuid::new_v4().simple().to_string();
            let account = Account {
                id: Uuid::new_v4(),
                email: email.to_string(),
                digest: password_digest(&salt, password),
                salt,
            };
            let identity = Identity {
                id: account.id,
                email: Some(account.email.clone()),
            };
            accounts.insert(key, account);
            identity
        };

        log::info!("Registered account {}", identity.id);
        self.set_current(Some(identity.clone()))?;
        Ok(identity)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(IdentityError::InvalidEmail);
        }

        let identity = {
            let accounts = self
                .accounts
                .lock()
                .map_err(|_| IdentityError::Other("Failed to acquire lock".into()))?;

            let account = accounts
                .get(&normalize_email(email))
                .ok_or(IdentityError::InvalidCredentials)?;
            if password_digest(&account.salt, password) != account.digest {
                log::warn!("Rejected login for account {}", account.id);
                return Err(IdentityError::InvalidCredentials);
            }

            Identity {
                id: account.id,
                email: Some(account.email.clone()),
            }
        };

        self.set_current(Some(identity.clone()))?;
        Ok(identity)
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        self.set_current(None)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().ok().and_then(|current| current.clone())
    }
}
