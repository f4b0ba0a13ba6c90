//! Password hashing with bcrypt.
//!
//! Hashing and verification run on the blocking thread pool; bcrypt is
//! deliberately slow and must not stall the async workers.

use std::sync::{Arc, OnceLock};

pub const DEFAULT_COST: u32 = 10;

/// Bounds accepted by bcrypt.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way salted password hashing.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash compared against when the account does not exist.
    dummy_hash: Arc<OnceLock<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    pub async fn hash(&self, raw: &str) -> Result<String, PasswordError> {
        let raw = raw.to_owned();
        let cost = self.cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(raw, cost)).await??;
        Ok(hash)
    }

    /// Check `raw` against a stored bcrypt hash.
    pub async fn verify(&self, raw: &str, hash: &str) -> Result<bool, PasswordError> {
        let raw = raw.to_owned();
        let hash = hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(raw, &hash)).await??;
        Ok(valid)
    }

    /// Burn the same amount of work as a real verification, for a login whose
    /// email matched no account. Always returns `false`.
    pub async fn verify_absent(&self, raw: &str) -> Result<bool, PasswordError> {
        let raw = raw.to_owned();
        let cost = self.cost;
        let dummy_hash = self.dummy_hash.clone();
        tokio::task::spawn_blocking(move || {
            let hash = match dummy_hash.get() {
                Some(hash) => hash.clone(),
                None => {
                    let hash = bcrypt::hash("jobboard-absent-account", cost)?;
                    dummy_hash.get_or_init(|| hash).clone()
                }
            };
            bcrypt::verify(raw, &hash).map(|_| false)
        })
        .await?
        .map_err(PasswordError::from)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}
