use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::warn;

use super::password::Hasher;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,       // 0 until the store assigns one
    pub email: String, // trimmed, lower-cased
    #[serde(skip_serializing)]
    pub password: String, // Argon2 PHC string once persisted
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn new(email: impl Into<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id: 0,
            email: email.into(),
            password: String::new(),
            is_active: true,
            last_login: None,
            created_at,
        }
    }

    pub fn has_valid_email(&self) -> bool {
        lazy_static! {
            static ref EMAIL_RE: Regex =
                Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                    .expect("email pattern compiles");
        }
        EMAIL_RE.is_match(&self.email)
    }

    /// Replaces the password field with the hash of `plain`.
    pub fn apply_password(&mut self, hasher: &dyn Hasher, plain: &str) -> anyhow::Result<()> {
        self.password = hasher.hash(plain)?;
        Ok(())
    }

    pub fn verify_password(&self, hasher: &dyn Hasher, candidate: &str) -> bool {
        match hasher.verify(candidate, &self.password) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, user_id = self.id, "stored password hash unusable");
                false
            }
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
