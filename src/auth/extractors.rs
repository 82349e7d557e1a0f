use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts the bearer token, validates it, and loads the caller's user
/// row. Every failure mode answers the same vague 403.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(unauthenticated)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(unauthenticated)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).ok_or_else(|| {
            warn!("invalid or expired token");
            unauthenticated()
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                unauthenticated()
            })?;

        Ok(CurrentUser(user))
    }
}

fn unauthenticated() -> ApiError {
    ApiError::Unauthenticated("Not authenticated".into())
}

/// Ownership gate shared by every customer-scoped endpoint: the path's
/// customer id must be the caller's own. Runs before any resource access,
/// so the answer does not depend on whether the resource exists.
pub fn ensure_owner(caller: &User, customer_id: &str, detail: &str) -> Result<(), ApiError> {
    if caller.user_id.to_string() != customer_id {
        warn!(caller = %caller.user_id, customer_id, "ownership check failed");
        return Err(ApiError::Forbidden(detail.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn make_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            user_id: Uuid::new_v4(),
            email: "caller@example.com".into(),
            password_hash: "x".into(),
            role: "customer".into(),
            last_issued_token: None,
            reset_token: None,
            reset_token_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_passes_for_own_id() {
        let user = make_user();
        let id = user.user_id.to_string();
        assert!(ensure_owner(&user, &id, "You can only access your own documents").is_ok());
    }

    #[test]
    fn owner_rejects_other_id_with_forbidden() {
        let user = make_user();
        let err = ensure_owner(
            &user,
            "00000000-0000-0000-0000-000000000000",
            "You can only access your own documents",
        )
        .unwrap_err();
        match err {
            ApiError::Forbidden(detail) => {
                assert_eq!(detail, "You can only access your own documents")
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn owner_rejects_non_uuid_path_values() {
        let user = make_user();
        assert!(ensure_owner(&user, "not-a-uuid", "forbidden").is_err());
    }
}
