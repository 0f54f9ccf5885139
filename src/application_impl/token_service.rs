use crate::application_port::{
    AccessToken, AccessTokenData, AuthError, RefreshToken, RefreshTokenData, TokenCodec, TokenPair,
};
use crate::domain_model::{SessionId, SessionRecord, User};
use crate::domain_port::{CacheStore, SessionRepo, UserRepo};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

fn session_key(session_id: SessionId) -> String {
    format!("session:{}", session_id)
}

fn revoked_key(session_id: SessionId) -> String {
    format!("session:revoked:{}", session_id)
}

/// Issues, verifies, rotates, and revokes session-bound token pairs.
///
/// The session repo is authoritative. The cache holds two kinds of entries,
/// both optimizations: a mirror of the session record keyed by session id,
/// and a revocation marker. Only the marker may short-circuit a security
/// decision — revocation is one-way, so a cached "revoked" can never be
/// stale-wrong, while a cached "active" could be and is never trusted.
pub struct TokenService {
    codec: Arc<dyn TokenCodec>,
    sessions: Arc<dyn SessionRepo>,
    users: Arc<dyn UserRepo>,
    cache: Arc<dyn CacheStore>,
}

impl TokenService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        sessions: Arc<dyn SessionRepo>,
        users: Arc<dyn UserRepo>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            codec,
            sessions,
            users,
            cache,
        }
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    async fn mirror_session(&self, record: &SessionRecord) {
        if let Ok(json) = serde_json::to_string(record) {
            self.cache
                .set(
                    &session_key(record.session_id),
                    &json,
                    Self::ttl_secs(record.expires_at),
                )
                .await;
        }
    }

    /// The mirror may only serve the happy path: it is accepted when it is
    /// unrevoked, unexpired, and matches the token's version. Expiry only
    /// ever moves later and the rotation swap re-checks version and
    /// revocation against the repo, so a positive mirror cannot admit a
    /// refresh the repo would reject. Every negative signal falls through
    /// to the repo instead of being acted on.
    async fn mirrored_session(&self, data: &RefreshTokenData) -> Option<SessionRecord> {
        let json = self.cache.get(&session_key(data.session_id)).await?;
        let record: SessionRecord = serde_json::from_str(&json).ok()?;
        (!record.revoked
            && !record.is_expired(Utc::now())
            && record.refresh_version == data.version)
            .then_some(record)
    }

    /// Mints a fresh session and a token pair bound to it.
    pub async fn generate_tokens(&self, user: &User) -> Result<TokenPair, AuthError> {
        let session_id = SessionId::generate();

        let (access_token, access_exp) =
            self.codec.issue_access_token(user, session_id).await?;
        let (refresh_token, refresh_exp) = self
            .codec
            .issue_refresh_token(user.user_id, session_id, 0)
            .await?;

        let record = SessionRecord {
            session_id,
            user_id: user.user_id,
            issued_at: Utc::now(),
            expires_at: refresh_exp,
            revoked: false,
            refresh_version: 0,
        };
        self.sessions.create(&record).await?;
        self.mirror_session(&record).await;

        Ok(TokenPair {
            access_token,
            refresh_token,
            session_id,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Full verification: signature, standard claims, then session
    /// revocation against the authoritative store.
    pub async fn verify_access_token(&self, token: &str) -> Result<AccessTokenData, AuthError> {
        let data = self
            .codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?;

        // Monotone-safe fast path: a revocation marker cannot be stale.
        if self.cache.get(&revoked_key(data.session_id)).await.is_some() {
            return Err(AuthError::SessionRevoked);
        }

        let session = self
            .sessions
            .get(data.session_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if session.revoked {
            self.cache
                .set(&revoked_key(data.session_id), "1", Self::ttl_secs(session.expires_at))
                .await;
            return Err(AuthError::SessionRevoked);
        }
        if session.is_expired(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        Ok(data)
    }

    /// Rotates the pair under the same session id. The compare-and-swap on
    /// refresh_version makes replayed or concurrently-used refresh tokens
    /// lose: exactly one caller per version ever gets a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let data = self
            .codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await?;

        let session = match self.mirrored_session(&data).await {
            Some(session) => session,
            None => {
                let session = self
                    .sessions
                    .get(data.session_id)
                    .await?
                    .ok_or(AuthError::TokenInvalid)?;
                if session.revoked {
                    return Err(AuthError::SessionRevoked);
                }
                if session.is_expired(Utc::now()) {
                    return Err(AuthError::TokenExpired);
                }
                if data.version != session.refresh_version {
                    debug!(session_id = %data.session_id, "stale refresh token version");
                    return Err(AuthError::TokenInvalid);
                }
                session
            }
        };

        let user = self
            .users
            .find_by_id(data.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::TokenInvalid);
        }

        let next_version = session.refresh_version + 1;
        let (access_token, access_exp) =
            self.codec.issue_access_token(&user, data.session_id).await?;
        let (new_refresh_token, refresh_exp) = self
            .codec
            .issue_refresh_token(user.user_id, data.session_id, next_version)
            .await?;

        let won = self
            .sessions
            .rotate(data.session_id, session.refresh_version, refresh_exp)
            .await?;
        if !won {
            debug!(session_id = %data.session_id, "lost refresh rotation race");
            return Err(AuthError::TokenInvalid);
        }

        self.mirror_session(&SessionRecord {
            expires_at: refresh_exp,
            refresh_version: next_version,
            ..session
        })
        .await;

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
            session_id: data.session_id,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Idempotent revocation. True when the session exists (even if it was
    /// already revoked), false for an unknown id.
    pub async fn invalidate_session(&self, session_id: SessionId) -> Result<bool, AuthError> {
        let session = self.sessions.get(session_id).await?;
        let existed = self.sessions.revoke(session_id).await?;

        if existed {
            let marker_ttl = session
                .map(|s| Self::ttl_secs(s.expires_at))
                .unwrap_or(24 * 3600);
            self.cache
                .set(&revoked_key(session_id), "1", marker_ttl)
                .await;
            self.cache.del(&session_key(session_id)).await;
        }

        Ok(existed)
    }
}
