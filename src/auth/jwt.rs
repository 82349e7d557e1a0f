use std::time::Duration;

use axum::extract::FromRef;
use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Access-token payload. `sub`/`email`/`role` identify the caller;
/// `exp` makes the token self-expiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub access_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
            ..
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    /// Sign an HS256 access token for the user, expiring after the
    /// configured TTL.
    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.user_id,
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.user_id, "jwt signed");
        Ok(token)
    }

    /// Decode and validate; any failure (bad signature, expired,
    /// malformed) collapses to `None` so callers cannot tell why.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Some(data.claims)
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }
}

/// Opaque password-reset secret: 32 random bytes, URL-safe base64.
/// Not a JWT; its expiry lives in the user row, not in the token.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn make_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            user_id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: "irrelevant".into(),
            role: "customer".into(),
            last_issued_token: None,
            reset_token: None,
            reset_token_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip_claims() {
        let keys = make_keys();
        let user = make_user();
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.role, "customer");
        assert!(claims.exp > OffsetDateTime::now_utc().unix_timestamp() as usize);
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign(&make_user()).expect("sign");
        // flip one byte in the signature segment
        let mut bytes = token.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).expect("utf8");
        assert!(keys.verify(&tampered).is_none());
    }

    #[tokio::test]
    async fn verify_rejects_expired_token() {
        let keys = make_keys();
        let user = make_user();
        let past = OffsetDateTime::now_utc() - TimeDuration::minutes(10);
        let claims = Claims {
            sub: user.user_id,
            email: user.email,
            role: user.role,
            iat: (past - TimeDuration::minutes(30)).unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_none());
    }

    #[tokio::test]
    async fn verify_rejects_garbage() {
        let keys = make_keys();
        assert!(keys.verify("not-a-jwt").is_none());
        assert!(keys.verify("").is_none());
    }

    #[test]
    fn reset_tokens_are_unique_and_urlsafe() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        // 32 bytes -> 43 chars of unpadded base64url
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
