use crate::application_port::AuthError;
use crate::domain_model::{User, UserId};
use crate::domain_port::UserRepo;
use chrono::Utc;
use dashmap::DashMap;

/// In-process user store for the `memory` backend and unit tests.
pub struct MemoryUserRepo {
    by_id: DashMap<UserId, User>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    pub fn insert(&self, user: User) {
        self.by_id.insert(user.user_id, user);
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .by_id
            .iter()
            .find(|entry| entry.value().email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.by_id.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn touch_last_login(&self, user_id: UserId) -> Result<(), AuthError> {
        match self.by_id.get_mut(&user_id) {
            Some(mut entry) => {
                entry.value_mut().last_login_at = Some(Utc::now());
                Ok(())
            }
            None => Err(AuthError::UserNotFound),
        }
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
        must_change_password: bool,
    ) -> Result<(), AuthError> {
        match self.by_id.get_mut(&user_id) {
            Some(mut entry) => {
                let user = entry.value_mut();
                user.password_hash = password_hash.to_string();
                user.must_change_password = must_change_password;
                Ok(())
            }
            None => Err(AuthError::UserNotFound),
        }
    }
}
