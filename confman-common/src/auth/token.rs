//! Signed bearer tokens
//!
//! HS256 JWTs carrying the user id and the role at issue time. The role claim
//! is informative only: the server re-loads the live user on every request
//! and authorizes against the stored role.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::Role;
use crate::{Error, Result};

/// Settings key holding the generated secret
const TOKEN_SECRET_KEY: &str = "token_secret";

/// Token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| Error::Token(format!("Invalid subject: {}", e)))
    }
}

/// Issues and verifies tokens with one server secret
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String> {
        self.encode(&Claims::new(user_id, role, self.ttl))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| Error::Token(e.to_string()))
    }

    /// Decode and check signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Token(e.to_string()))
    }
}

/// Load the token secret from settings, generating and persisting one if absent
///
/// Used only when no secret is configured, so tokens survive restarts.
pub async fn load_token_secret(db: &SqlitePool) -> Result<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let candidate: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    // First writer wins; everyone reads back the stored value
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(TOKEN_SECRET_KEY)
        .bind(&candidate)
        .execute(db)
        .await?;

    let (secret,): (String,) = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(TOKEN_SECRET_KEY)
        .fetch_one(db)
        .await?;

    Ok(secret)
}
