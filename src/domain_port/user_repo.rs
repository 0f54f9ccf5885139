use crate::application_port::AuthError;
use crate::domain_model::{User, UserId};

/// The user store is owned by the wider platform; this port covers only
/// what the auth core needs from it.
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError>;

    async fn touch_last_login(&self, user_id: UserId) -> Result<(), AuthError>;

    /// Replaces the stored hash and sets the forced-change flag in the same
    /// write.
    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
        must_change_password: bool,
    ) -> Result<(), AuthError>;
}
