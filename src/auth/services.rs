use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        password::Hasher,
        repo::{StoreError, UserStore},
        user::{normalize_email, User},
    },
    clock::Clock,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub const EMAIL_REQUIRED: &str = "email is required";
pub const PASSWORD_TOO_SHORT: &str = "password must be at least 8 characters long";
pub const PASSWORD_MISMATCH: &str = "password and confirm password do not match";
pub const INVALID_EMAIL: &str = "invalid email";
pub const EMAIL_NOT_AVAILABLE: &str = "email is not available";

// Verified against for unknown emails so both login failure paths cost one hash.
const TIMING_DUMMY_PASSWORD: &str = "timing-equalizer-not-a-real-password";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Client-caused, message is safe to return as-is.
    #[error("{0}")]
    Validation(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn Hasher>,
    clock: Arc<dyn Clock>,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn Hasher>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher
            .hash(TIMING_DUMMY_PASSWORD)
            .context("precompute dummy password hash")?;
        Ok(Self {
            store,
            hasher,
            clock,
            dummy_hash,
        })
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Validates the request, hashes the password and persists the user.
    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        if email.is_empty() {
            return Err(AuthError::Validation(EMAIL_REQUIRED));
        }
        // byte length
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(PASSWORD_TOO_SHORT));
        }
        if password != confirm_password {
            return Err(AuthError::Validation(PASSWORD_MISMATCH));
        }

        let user = User::new(normalize_email(email), self.clock.now());
        if !user.has_valid_email() {
            warn!(email = %user.email, "invalid email");
            return Err(AuthError::Validation(INVALID_EMAIL));
        }

        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_owned();
        let user = tokio::task::spawn_blocking(move || {
            let mut user = user;
            user.apply_password(hasher.as_ref(), &plain)?;
            Ok::<_, anyhow::Error>(user)
        })
        .await
        .context("password hashing task")??;

        match self.store.create(user).await {
            Ok(user) => {
                info!(user_id = user.id, email = %user.email, "user registered");
                Ok(user)
            }
            Err(StoreError::DuplicateEmail) => {
                warn!("email already registered");
                Err(AuthError::Validation(EMAIL_NOT_AVAILABLE))
            }
            Err(e) => {
                error!(error = %e, "create user failed");
                Err(AuthError::Internal(e.into()))
            }
        }
    }

    /// Looks the user up and checks the password. Every failure is `InvalidCredentials`.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);

        let found = match self.store.find_by_email(&email).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => {
                warn!("login unknown email");
                None
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                None
            }
        };
        let known = found.is_some();

        let hasher = Arc::clone(&self.hasher);
        let dummy_hash = self.dummy_hash.clone();
        let candidate = password.to_owned();
        let verified = tokio::task::spawn_blocking(move || match found {
            Some(user) => user
                .verify_password(hasher.as_ref(), &candidate)
                .then_some(user),
            None => {
                let _ = hasher.verify(&candidate, &dummy_hash);
                None
            }
        })
        .await
        .context("password verification task")?;

        match verified {
            Some(user) => {
                info!(user_id = user.id, "user logged in");
                Ok(user)
            }
            None => {
                if known {
                    warn!("login invalid password");
                }
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
