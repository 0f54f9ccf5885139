use crate::application_port::AuthError;
use crate::domain_model::{Role, User, UserId};
use crate::domain_port::UserRepo;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    fn row_to_user(row: MySqlRow) -> Result<User, AuthError> {
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = UserId(
            Uuid::from_slice(&user_id_bytes).map_err(|e| AuthError::Store(e.to_string()))?,
        );

        let role_str: String = row
            .try_get("role")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let role: Role = role_str.parse().map_err(AuthError::Store)?;

        let last_login_at: Option<DateTime<Utc>> = row
            .try_get("last_login_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(User {
            user_id,
            email: row
                .try_get("email")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            password_hash: row
                .try_get("password_hash")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            first_name: row
                .try_get("first_name")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            last_name: row
                .try_get("last_name")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            role,
            is_active: row
                .try_get("is_active")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            must_change_password: row
                .try_get("must_change_password")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            last_login_at,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, email, password_hash, first_name, last_name, role,
       is_active, must_change_password, last_login_at
FROM user
WHERE email = ?
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_user).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, email, password_hash, first_name, last_name, role,
       is_active, must_change_password, last_login_at
FROM user
WHERE user_id = ?
"#,
        )
        .bind(Self::uid_as_bytes(&user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_user).transpose()
    }

    async fn touch_last_login(&self, user_id: UserId) -> Result<(), AuthError> {
        sqlx::query("UPDATE user SET last_login_at = ? WHERE user_id = ?")
            .bind(Utc::now())
            .bind(Self::uid_as_bytes(&user_id))
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
        must_change_password: bool,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
UPDATE user
SET password_hash = ?, must_change_password = ?
WHERE user_id = ?
"#,
        )
        .bind(password_hash)
        .bind(must_change_password)
        .bind(Self::uid_as_bytes(&user_id))
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }
}
