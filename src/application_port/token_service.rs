use crate::application_port::AuthError;
use crate::domain_model::{Role, SessionId, User, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub session_id: SessionId,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Verified claims of an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenData {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub session_id: SessionId,
}

/// Verified claims of a refresh token. `version` is the session's
/// refresh_version at issue time; a stale version marks a rotated-out token.
#[derive(Debug, Clone)]
pub struct RefreshTokenData {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub version: i64,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        user: &User,
        session_id: SessionId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;

    async fn issue_refresh_token(
        &self,
        user_id: UserId,
        session_id: SessionId,
        version: i64,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;

    async fn verify_access_token(&self, token: &AccessToken)
    -> Result<AccessTokenData, AuthError>;

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenData, AuthError>;
}
