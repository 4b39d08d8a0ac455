use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::user::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user with this email already exists")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user and return it with its generated id.
    async fn create(&self, user: User) -> Result<User, StoreError>;
    /// Exact match; callers normalize the email first.
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password, is_active, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password, is_active, last_login, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.is_active)
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password, is_active, last_login, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

/// Postgres reports unique constraint violations as SQLSTATE 23505.
pub(crate) fn is_unique_violation_code(code: &str) -> bool {
    code == "23505"
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db)
            if db.code().is_some_and(|c| is_unique_violation_code(&c)) =>
        {
            StoreError::DuplicateEmail
        }
        other => StoreError::Database(other),
    }
}
