//! Login and bearer tokens.
//!
//! Tokens are not signed: `mock_token_<id>` decodes straight back to a user
//! id. This is a stand-in for a real token service and must never guard real
//! data. Passwords, on the other hand, are stored as salted SHA-256 digests
//! and compared in constant time.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::db::{Database, UserRecord};
use crate::error::ApiError;

pub const TOKEN_PREFIX: &str = "mock_token_";
pub const TOKEN_TYPE: &str = "bearer";

const INVALID_CREDENTIALS: &str = "Incorrect email or password";

/// Digest stored for a user's password. The user id salts the hash so equal
/// passwords do not produce equal digests.
pub fn credential_digest(user_id: i64, password: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(user_id.to_be_bytes());
    hasher.update(b":");
    hasher.update(password.expose_secret().as_bytes());
    hasher.finalize().into()
}

pub fn digest_matches(stored: &[u8; 32], user_id: i64, password: &SecretString) -> bool {
    let candidate = credential_digest(user_id, password);
    stored.ct_eq(&candidate).unwrap_u8() == 1
}

pub fn issue_token(user_id: i64) -> String {
    format!("{TOKEN_PREFIX}{user_id}")
}

/// User id carried by a token, or `None` if it is not one of ours.
pub fn decode_token(token: &str) -> Option<i64> {
    let digits = token.trim().strip_prefix(TOKEN_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|id| *id > 0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Check credentials, stamp `last_login`, and hand out a token.
pub async fn login(
    db: &dyn Database,
    username: &str,
    password: &SecretString,
) -> Result<(UserRecord, AccessToken), ApiError> {
    let Some(user) = db.find_user_by_email(username.trim()).await? else {
        tracing::warn!("Login rejected for unknown account");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
    };
    if !db.verify_password(user.id, password).await? {
        tracing::warn!(user_id = user.id, "Login rejected: bad password");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
    }
    if !user.is_active {
        tracing::warn!(user_id = user.id, "Login rejected: inactive user");
        return Err(ApiError::Authentication("Inactive user".to_string()));
    }

    let user = db
        .record_login(user.id)
        .await?
        .ok_or_else(|| ApiError::Authentication(INVALID_CREDENTIALS.to_string()))?;
    tracing::info!(user_id = user.id, role = user.role.as_str(), "User logged in");
    let token = AccessToken {
        access_token: issue_token(user.id),
        token_type: TOKEN_TYPE,
    };
    Ok((user, token))
}

/// Resolve a bearer token to an active user.
pub async fn authenticate(db: &dyn Database, token: &str) -> Result<UserRecord, ApiError> {
    let Some(user_id) = decode_token(token) else {
        return Err(ApiError::Authentication(
            "Could not validate credentials".to_string(),
        ));
    };
    match db.get_user(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(ApiError::Authentication("Inactive user".to_string())),
        None => Err(ApiError::Authentication(
            "Could not validate credentials".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UpdateUserParams;
    use crate::testing::seeded_store;

    fn secret(raw: &str) -> SecretString {
        SecretString::from(raw.to_string())
    }

    #[test]
    fn token_round_trip_and_rejects_foreign_tokens() {
        assert_eq!(decode_token(&issue_token(42)), Some(42));
        assert_eq!(decode_token("mock_token_"), None);
        assert_eq!(decode_token("mock_token_-3"), None);
        assert_eq!(decode_token("mock_token_0"), None);
        assert_eq!(decode_token("mock_token_12abc"), None);
        assert_eq!(decode_token("Bearer mock_token_1"), None);
    }

    #[test]
    fn digests_are_salted_by_user() {
        let password = secret("password");
        assert_ne!(
            credential_digest(1, &password),
            credential_digest(2, &password)
        );
        let stored = credential_digest(1, &password);
        assert!(digest_matches(&stored, 1, &password));
        assert!(!digest_matches(&stored, 1, &secret("Password")));
    }

    #[tokio::test]
    async fn owner_login_yields_token_for_owner() {
        let db = seeded_store().await;
        let (user, token) = login(db.as_ref(), "owner@firm.com", &secret("password"))
            .await
            .expect("owner login");
        assert_eq!(token.token_type, "bearer");
        assert_eq!(decode_token(&token.access_token), Some(user.id));
        assert!(user.last_login.is_some());
        assert_eq!(user.email, "owner@firm.com");
    }

    #[tokio::test]
    async fn wrong_password_is_an_authentication_failure() {
        let db = seeded_store().await;
        let err = login(db.as_ref(), "owner@firm.com", &secret("hunter2"))
            .await
            .expect_err("bad password");
        assert!(matches!(err, ApiError::Authentication(_)));

        let err = login(db.as_ref(), "nobody@firm.com", &secret("password"))
            .await
            .expect_err("unknown user");
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn inactive_users_cannot_log_in_or_authenticate() {
        let db = seeded_store().await;
        let assistant = db
            .find_user_by_email("assistant@firm.com")
            .await
            .expect("lookup")
            .expect("seeded assistant");
        db.update_user(
            assistant.id,
            &UpdateUserParams {
                is_active: Some(false),
                ..UpdateUserParams::default()
            },
        )
        .await
        .expect("deactivate");

        let err = login(db.as_ref(), "assistant@firm.com", &secret("password"))
            .await
            .expect_err("inactive");
        assert!(matches!(err, ApiError::Authentication(ref m) if m == "Inactive user"));

        let err = authenticate(db.as_ref(), &issue_token(assistant.id))
            .await
            .expect_err("inactive token");
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn authenticate_rejects_tokens_for_missing_users() {
        let db = seeded_store().await;
        let err = authenticate(db.as_ref(), "mock_token_999")
            .await
            .expect_err("missing user");
        assert!(matches!(err, ApiError::Authentication(_)));

        let owner = authenticate(db.as_ref(), &issue_token(1))
            .await
            .expect("owner token");
        assert_eq!(owner.id, 1);
    }
}
