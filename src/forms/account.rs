//! Login and registration forms
//!
//! Identity failures end here: they become the form message and are never
//! returned to the caller.

use std::sync::Arc;

use crate::auth::identity::IdentityGateway;
use crate::auth::session::Route;

use super::LoadingFlag;

const REGISTERED_MESSAGE: &str = "Registration successful! Please log in.";

/// Email/password form state shared by login and registration
struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    fn new() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
        }
    }
}

pub struct LoginForm {
    gateway: Arc<dyn IdentityGateway>,
    credentials: Credentials,
    message: Option<String>,
    loading: LoadingFlag,
}

impl LoginForm {
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        Self {
            gateway,
            credentials: Credentials::new(),
            message: None,
            loading: LoadingFlag::new(),
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.credentials.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.credentials.password = password.into();
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_busy()
    }

    /// Sign in. Returns where to navigate on success.
    pub async fn submit(&mut self) -> Option<Route> {
        self.message = None;
        let _busy = self.loading.begin();

        match self
            .gateway
            .login(&self.credentials.email, &self.credentials.password)
            .await
        {
            Ok(identity) => {
                let email = identity
                    .email
                    .unwrap_or_else(|| self.credentials.email.clone());
                self.message = Some(format!("Welcome {}!", email));
                Some(Route::Notes)
            }
            Err(e) => {
                log::warn!("Login failed: {}", e);
                self.message = Some(e.login_message().to_string());
                None
            }
        }
    }
}

pub struct RegisterForm {
    gateway: Arc<dyn IdentityGateway>,
    credentials: Credentials,
    message: Option<String>,
    loading: LoadingFlag,
}

impl RegisterForm {
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        Self {
            gateway,
            credentials: Credentials::new(),
            message: None,
            loading: LoadingFlag::new(),
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.credentials.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.credentials.password = password.into();
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_busy()
    }

    /// Create the account (which also signs it in). Returns where to
    /// navigate on success.
    pub async fn submit(&mut self) -> Option<Route> {
        self.message = None;
        let _busy = self.loading.begin();

        match self
            .gateway
            .register(&self.credentials.email, &self.credentials.password)
            .await
        {
            Ok(identity) => {
                log::info!("Registered {}", identity.id);
                self.message = Some(REGISTERED_MESSAGE.to_string());
                Some(Route::Notes)
            }
            Err(e) => {
                log::warn!("Registration failed: {}", e);
                self.message = Some(e.register_message().to_string());
                None
            }
        }
    }
}
