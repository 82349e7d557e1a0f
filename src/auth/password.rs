use crate::error::ApiError;
use tracing::error;

/// Work factor baked into every digest; verification needs no side channel.
const BCRYPT_COST: u32 = 12;

/// bcrypt ignores input past 72 bytes, so longer passwords are rejected
/// outright instead of being silently truncated.
const BCRYPT_MAX_BYTES: usize = 72;

pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    if plain.len() > BCRYPT_MAX_BYTES {
        return Err(ApiError::Validation(
            "Password cannot be longer than 72 bytes".into(),
        ));
    }
    bcrypt::hash(plain, BCRYPT_COST).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        ApiError::Internal(anyhow::anyhow!(e))
    })
}

/// Never errors: a malformed stored digest is indistinguishable from a
/// wrong password to the caller.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
