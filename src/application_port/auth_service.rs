use crate::application_port::TokenPair;
use crate::domain_model::{Role, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("session revoked")]
    SessionRevoked,
    #[error("password change required")]
    PasswordChangeRequired,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user not found")]
    UserNotFound,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Public profile slice returned at login; never carries the hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserProfile,
    pub tokens: TokenPair,
    pub requires_password_change: bool,
}

/// Logout accepts either handle; an access token is resolved to its session
/// through full verification, never the unverified edge decode.
#[derive(Debug, Clone, Default)]
pub struct LogoutInput {
    pub session_id: Option<String>,
    pub access_token: Option<String>,
}

/// Verified caller identity attached to privileged requests.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub session_id: SessionId,
    pub must_change_password: bool,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;

    /// Always succeeds from the caller's point of view, whatever the state
    /// of the session; failures are swallowed so clients cannot probe for
    /// live session ids.
    async fn logout(&self, request: LogoutInput) -> Result<(), AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Full verification for privileged routes. Re-reads the user row so a
    /// pending forced password change blocks every request, not just the
    /// next login.
    async fn authenticate(&self, access_token: &str) -> Result<AuthContext, AuthError>;

    async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}
