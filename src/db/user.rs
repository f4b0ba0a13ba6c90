use sqlx::sqlite::SqlitePool;

use crate::jwt::Identity;
use crate::password::{PasswordError, PasswordHasher};

/// Credential store: user lookup, password verification and account creation.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
    hasher: PasswordHasher,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    /// Identity claims carried by this user's tokens.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl UserStore {
    pub fn new(pool: SqlitePool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, username, email, password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, username, email, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Check whether an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Hash the password and insert a new user. Returns the user ID.
    ///
    /// The unique index on `email` decides duplicates; a concurrent
    /// registration that slips past any pre-check still fails here.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<i64, CreateUserError> {
        let password_hash = self.hasher.hash(raw_password).await?;

        let result =
            sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
                .bind(username)
                .bind(email)
                .bind(&password_hash)
                .execute(&self.pool)
                .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CreateUserError::DuplicateEmail)
            }
            Err(e) => Err(CreateUserError::Database(e)),
        }
    }

    /// Look up the account for `email` and check `raw_password` against it.
    ///
    /// Returns `None` both for an unknown email and for a wrong password.
    /// An unknown email still pays for one bcrypt verification.
    pub async fn verify_credentials(
        &self,
        email: &str,
        raw_password: &str,
    ) -> Result<Option<User>, VerifyCredentialsError> {
        let Some(user) = self.get_by_email(email).await? else {
            self.hasher.verify_absent(raw_password).await?;
            return Ok(None);
        };

        if self.hasher.verify(raw_password, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyCredentialsError {
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
