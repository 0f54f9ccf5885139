use crate::application_port::AuthError;
use crate::domain_model::{SessionId, SessionRecord};
use chrono::{DateTime, Utc};

/// Authoritative session store. Revocation decisions are always taken
/// against this repo, never against a cache.
#[async_trait::async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(&self, record: &SessionRecord) -> Result<(), AuthError>;

    async fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, AuthError>;

    /// Sets revoked = true. Returns true when the session exists (including
    /// one already revoked), false for an unknown id. Never clears the flag.
    async fn revoke(&self, session_id: SessionId) -> Result<bool, AuthError>;

    /// Compare-and-swap rotation: bumps refresh_version and moves expiry
    /// only if the stored version still equals `expected_version` and the
    /// session is not revoked. Returns false when the swap loses.
    async fn rotate(
        &self,
        session_id: SessionId,
        expected_version: i64,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthError>;
}
