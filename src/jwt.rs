//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with two independent secrets. Both
//! carry the same identity claims; a token only verifies against the secret
//! of its own kind, so a refresh token is never accepted as an access token
//! and vice versa.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token lifetime: 24 hours.
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token presented on every protected request
    Access,
    /// Long-lived token used only to obtain new access tokens
    Refresh,
}

impl TokenType {
    /// Lifetime of a token of this kind, in seconds.
    pub fn duration(self) -> u64 {
        match self {
            TokenType::Access => ACCESS_TOKEN_DURATION_SECS,
            TokenType::Refresh => REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

/// The identity a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    /// The identity fields, without token metadata.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Result of issuing a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed JWT string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signing configuration for both token kinds. Built once at startup.
#[derive(Clone)]
pub struct JwtConfig {
    access: Keys,
    refresh: Keys,
}

impl JwtConfig {
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access: Keys::from_secret(access_secret),
            refresh: Keys::from_secret(refresh_secret),
        }
    }

    fn keys(&self, kind: TokenType) -> &Keys {
        match kind {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<IssuedToken, JwtError> {
        self.issue_at(identity, TokenType::Access, unix_now()?)
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<IssuedToken, JwtError> {
        self.issue_at(identity, TokenType::Refresh, unix_now()?)
    }

    /// Issue a token as if it had been signed at `issued_at`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        kind: TokenType,
        issued_at: u64,
    ) -> Result<IssuedToken, JwtError> {
        let duration = kind.duration();
        let exp = issued_at + duration;

        let claims = Claims {
            id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            token_type: kind,
            iat: issued_at,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            duration,
        })
    }

    /// Verify a token's signature, expiry and kind.
    ///
    /// The two failure reasons are kept apart for logging only. Callers must
    /// treat them identically.
    pub fn verify(&self, token: &str, kind: TokenType) -> Result<Claims, VerifyError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<Claims>(token, &self.keys(kind).decoding, &validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => VerifyError::Expired,
                    _ => VerifyError::Malformed,
                })?;

        if token_data.claims.token_type != kind {
            return Err(VerifyError::Malformed);
        }

        Ok(token_data.claims)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, VerifyError> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, VerifyError> {
        self.verify(token, TokenType::Refresh)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::Time)?
        .as_secs())
}

/// Errors that can occur while issuing a token.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("System time error")]
    Time,
}

/// Reasons a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Unparseable, wrongly signed, or of the wrong kind
    #[error("malformed token")]
    Malformed,
    #[error("expired token")]
    Expired,
}
