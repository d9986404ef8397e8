//! JWT issuing and verification for the auth routes.

use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TTL_SECONDS: i64 = 60 * 60 * 24;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated account.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        TokenSigner {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Reads JWT_SECRET, falling back to a development-only default.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "keep it secret, keep it safe".to_string());
        Self::new(&secret, DEFAULT_TTL_SECONDS)
    }

    pub fn issue(&self, username: &str) -> Result<String, AppError> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token encode: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_and_verifies_round_trip() {
        let signer = TokenSigner::new("test-secret", 3600);
        let token = signer.issue("frodo").unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "frodo");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn rejects_tampered_tokens() {
        let signer = TokenSigner::new("test-secret", 3600);
        let other = TokenSigner::new("different-secret", 3600);
        let token = other.issue("frodo").unwrap();
        assert!(signer.verify(&token).is_err());
        assert!(signer.verify("not-even-a-jwt").is_err());
    }

    #[test]
    fn rejects_expired_tokens() {
        // jsonwebtoken applies 60s of leeway, so expire well past it.
        let signer = TokenSigner::new("test-secret", -120);
        let token = signer.issue("frodo").unwrap();
        assert!(signer.verify(&token).is_err());
    }
}
