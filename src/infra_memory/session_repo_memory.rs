use crate::application_port::AuthError;
use crate::domain_model::{SessionId, SessionRecord};
use crate::domain_port::SessionRepo;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// In-process session store. The dashmap shard lock held by `get_mut`
/// makes `revoke` and `rotate` atomic per session, matching the per-row
/// atomicity the MySQL implementation gets from its conditional UPDATEs.
pub struct MemorySessionRepo {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl MemorySessionRepo {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl Default for MemorySessionRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionRepo for MemorySessionRepo {
    async fn create(&self, record: &SessionRecord) -> Result<(), AuthError> {
        self.sessions.insert(record.session_id, record.clone());
        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, AuthError> {
        Ok(self
            .sessions
            .get(&session_id)
            .map(|entry| entry.value().clone()))
    }

    async fn revoke(&self, session_id: SessionId) -> Result<bool, AuthError> {
        match self.sessions.get_mut(&session_id) {
            Some(mut entry) => {
                entry.value_mut().revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate(
        &self,
        session_id: SessionId,
        expected_version: i64,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        match self.sessions.get_mut(&session_id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                if record.revoked || record.refresh_version != expected_version {
                    return Ok(false);
                }
                record.refresh_version += 1;
                record.expires_at = new_expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::UserId;
    use chrono::Duration;

    fn record() -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            session_id: SessionId::generate(),
            user_id: UserId(uuid::Uuid::new_v4()),
            issued_at: now,
            expires_at: now + Duration::days(7),
            revoked: false,
            refresh_version: 0,
        }
    }

    #[tokio::test]
    async fn rotate_is_a_compare_and_swap() {
        let repo = MemorySessionRepo::new();
        let record = record();
        repo.create(&record).await.unwrap();

        let later = Utc::now() + Duration::days(7);
        assert!(repo.rotate(record.session_id, 0, later).await.unwrap());
        // Same expected version again: the swap must lose.
        assert!(!repo.rotate(record.session_id, 0, later).await.unwrap());
        assert!(repo.rotate(record.session_id, 1, later).await.unwrap());

        let stored = repo.get(record.session_id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_version, 2);
    }

    #[tokio::test]
    async fn revoke_reports_existence_and_sticks() {
        let repo = MemorySessionRepo::new();
        let record = record();
        repo.create(&record).await.unwrap();

        assert!(repo.revoke(record.session_id).await.unwrap());
        assert!(repo.revoke(record.session_id).await.unwrap());
        assert!(!repo.revoke(SessionId::generate()).await.unwrap());

        let stored = repo.get(record.session_id).await.unwrap().unwrap();
        assert!(stored.revoked);
        // A revoked session cannot rotate.
        let later = Utc::now() + Duration::days(7);
        assert!(!repo.rotate(record.session_id, 0, later).await.unwrap());
    }
}
