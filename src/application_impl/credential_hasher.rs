use crate::application_port::{AuthError, CredentialHasher};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub struct Argon2CredentialHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2CredentialHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        if password.is_empty() {
            return Err(AuthError::Validation("password must not be empty".to_string()));
        }
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        // A malformed stored hash verifies as false rather than erroring;
        // the caller must not be able to distinguish it from a mismatch.
        let parsed = match PasswordHash::new(password_hash) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(false),
        };

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_round_trips() {
        let hasher = Argon2CredentialHasher;
        let hash = hasher.hash_password("Secret123!").await.unwrap();
        assert!(hasher.verify_password("Secret123!", &hash).await.unwrap());
        assert!(!hasher.verify_password("Secret123?", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_verifies_false_without_error() {
        let hasher = Argon2CredentialHasher;
        let ok = hasher
            .verify_password("Secret123!", "not-a-phc-hash")
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn empty_password_is_rejected() {
        let hasher = Argon2CredentialHasher;
        let err = hasher.hash_password("").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
