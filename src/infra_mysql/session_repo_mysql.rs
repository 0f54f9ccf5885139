use crate::application_port::AuthError;
use crate::domain_model::{SessionId, SessionRecord, UserId};
use crate::domain_port::SessionRepo;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlSessionRepo {
    pool: MySqlPool,
}

impl MySqlSessionRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSessionRepo { pool }
    }

    #[inline]
    fn sid_as_bytes(id: &SessionId) -> &[u8] {
        id.0.as_bytes()
    }

    fn row_to_record(row: MySqlRow) -> Result<SessionRecord, AuthError> {
        let session_id_bytes: Vec<u8> = row
            .try_get("session_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(SessionRecord {
            session_id: SessionId(
                Uuid::from_slice(&session_id_bytes)
                    .map_err(|e| AuthError::Store(e.to_string()))?,
            ),
            user_id: UserId(
                Uuid::from_slice(&user_id_bytes).map_err(|e| AuthError::Store(e.to_string()))?,
            ),
            issued_at: row
                .try_get("issued_at")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            revoked: row
                .try_get("revoked")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            refresh_version: row
                .try_get("refresh_version")
                .map_err(|e| AuthError::Store(e.to_string()))?,
        })
    }
}

#[async_trait::async_trait]
impl SessionRepo for MySqlSessionRepo {
    async fn create(&self, record: &SessionRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO session (session_id, user_id, issued_at, expires_at, revoked, refresh_version)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::sid_as_bytes(&record.session_id))
        .bind(record.user_id.0.as_bytes() as &[u8])
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.refresh_version)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT session_id, user_id, issued_at, expires_at, revoked, refresh_version
FROM session
WHERE session_id = ?
"#,
        )
        .bind(Self::sid_as_bytes(&session_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn revoke(&self, session_id: SessionId) -> Result<bool, AuthError> {
        // MySQL reports zero affected rows for a no-change update, so the
        // idempotence contract needs an existence check first.
        let exists: Option<MySqlRow> = sqlx::query("SELECT 1 FROM session WHERE session_id = ?")
            .bind(Self::sid_as_bytes(&session_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query("UPDATE session SET revoked = 1 WHERE session_id = ?")
            .bind(Self::sid_as_bytes(&session_id))
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(true)
    }

    async fn rotate(
        &self,
        session_id: SessionId,
        expected_version: i64,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        // The version predicate is the optimistic check: of two concurrent
        // rotations only one UPDATE matches, the other sees zero rows.
        let result = sqlx::query(
            r#"
UPDATE session
SET refresh_version = refresh_version + 1, expires_at = ?
WHERE session_id = ? AND refresh_version = ? AND revoked = 0
"#,
        )
        .bind(new_expires_at)
        .bind(Self::sid_as_bytes(&session_id))
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
