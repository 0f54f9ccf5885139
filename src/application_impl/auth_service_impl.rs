use crate::application_impl::TokenService;
use crate::application_port::{
    AuthContext, AuthError, AuthService, CredentialHasher, LoginInput, LoginResult, LogoutInput,
    TokenPair, UserProfile,
};
use crate::domain_model::{SessionId, User, password};
use crate::domain_port::UserRepo;
use std::sync::Arc;
use tracing::{debug, warn};

/// Login/logout/refresh orchestration for the portal roles. Delegates
/// credential storage to the platform's user store and all token/session
/// work to [`TokenService`].
pub struct PortalAuthService {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<TokenService>,
}

impl PortalAuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    fn profile(user: &User) -> UserProfile {
        UserProfile {
            user_id: user.user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            last_login_at: user.last_login_at,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for PortalAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;

        // Unknown email, wrong password, and deactivated account all
        // collapse into the same error so the response shape cannot be
        // used to probe which emails exist.
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = self
            .hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            debug!(%email, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.generate_tokens(&user).await?;

        if let Err(e) = self.users.touch_last_login(user.user_id).await {
            // Login still succeeds; the timestamp is bookkeeping.
            warn!(user_id = %user.user_id, error = %e, "failed to update last login");
        }

        Ok(LoginResult {
            requires_password_change: user.must_change_password,
            user: Self::profile(&user),
            tokens,
        })
    }

    async fn logout(&self, request: LogoutInput) -> Result<(), AuthError> {
        let session_id = match (&request.session_id, &request.access_token) {
            (Some(raw), _) => raw.parse::<SessionId>().ok(),
            (None, Some(token)) => self
                .tokens
                .verify_access_token(token)
                .await
                .ok()
                .map(|data| data.session_id),
            (None, None) => None,
        };

        if let Some(session_id) = session_id {
            match self.tokens.invalidate_session(session_id).await {
                Ok(existed) => debug!(%session_id, existed, "logout"),
                Err(e) => warn!(%session_id, error = %e, "logout invalidation failed"),
            }
        }

        // Always report success: a failed logout must not leak whether the
        // session ever existed, and the client discards its tokens anyway.
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.tokens.refresh(refresh_token).await
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthContext, AuthError> {
        let data = self.tokens.verify_access_token(access_token).await?;

        // The flag is read fresh from the store on every request: a token
        // minted before an admin reset must not bypass the gate.
        let user = self
            .users
            .find_by_id(data.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::TokenInvalid);
        }

        Ok(AuthContext {
            user_id: user.user_id,
            email: user.email,
            role: user.role,
            session_id: data.session_id,
            must_change_password: user.must_change_password,
        })
    }

    async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let data = self.tokens.verify_access_token(access_token).await?;
        let user = self
            .users
            .find_by_id(data.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::TokenInvalid);
        }

        let ok = self
            .hasher
            .verify_password(current_password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let check = password::validate_password(new_password);
        if !check.is_valid {
            return Err(AuthError::Validation(check.errors.join("; ")));
        }

        let new_hash = self.hasher.hash_password(new_password).await?;
        self.users
            .update_password(user.user_id, &new_hash, false)
            .await?;

        // Outstanding tokens for this session die with it; the user signs
        // in again with the new password.
        self.tokens.invalidate_session(data.session_id).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2CredentialHasher, JwtConfig, JwtHs256Codec};
    use crate::domain_model::{Role, UserId};
    use crate::infra_memory::{MemorySessionRepo, MemoryUserRepo};
    use crate::infra_redis::RedisFallbackCache;
    use std::time::Duration;

    async fn seeded_service(must_change: bool) -> (PortalAuthService, User, Arc<MemoryUserRepo>) {
        let hasher = Arc::new(Argon2CredentialHasher);
        let users = Arc::new(MemoryUserRepo::new());
        let user = User {
            user_id: UserId(uuid::Uuid::new_v4()),
            email: "a@b.com".to_string(),
            password_hash: hasher.hash_password("Secret123!").await.unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            role: Role::Caregiver,
            is_active: true,
            must_change_password: must_change,
            last_login_at: None,
        };
        users.insert(user.clone());

        let codec = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "caregate.test".to_string(),
            audience: "portal".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            signing_key: b"unit-test-signing-key".to_vec(),
        }));
        let tokens = Arc::new(TokenService::new(
            codec,
            Arc::new(MemorySessionRepo::new()),
            users.clone(),
            Arc::new(RedisFallbackCache::disconnected(1024)),
        ));

        (
            PortalAuthService::new(users.clone(), hasher, tokens),
            user,
            users,
        )
    }

    fn login_input(password: &str) -> LoginInput {
        LoginInput {
            email: "a@b.com".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_refresh_logout_end_to_end() {
        let (service, user, _users) = seeded_service(false).await;

        let result = service.login(login_input("Secret123!")).await.unwrap();
        assert_eq!(result.user.user_id, user.user_id);
        assert!(!result.requires_password_change);

        let rotated = service.refresh(&result.tokens.refresh_token.0).await.unwrap();
        assert_ne!(rotated.refresh_token.0, result.tokens.refresh_token.0);
        assert_eq!(rotated.session_id, result.tokens.session_id);

        let ctx = service.authenticate(&rotated.access_token.0).await.unwrap();
        assert_eq!(ctx.user_id, user.user_id);

        service
            .logout(LogoutInput {
                session_id: Some(result.tokens.session_id.to_string()),
                access_token: None,
            })
            .await
            .unwrap();

        let err = service
            .authenticate(&rotated.access_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionRevoked));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_identical() {
        let (service, _user, _users) = seeded_service(false).await;

        let wrong_password = service.login(login_input("Nope12345!")).await.unwrap_err();
        let unknown_email = service
            .login(LoginInput {
                email: "ghost@b.com".to_string(),
                password: "Secret123!".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn logout_succeeds_for_garbage_input() {
        let (service, _user, _users) = seeded_service(false).await;

        service.logout(LogoutInput::default()).await.unwrap();
        service
            .logout(LogoutInput {
                session_id: Some("not-a-uuid".to_string()),
                access_token: None,
            })
            .await
            .unwrap();
        service
            .logout(LogoutInput {
                session_id: None,
                access_token: Some("not-a-jwt".to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn login_reports_forced_password_change() {
        let (service, _user, _users) = seeded_service(true).await;

        let result = service.login(login_input("Secret123!")).await.unwrap();
        assert!(result.requires_password_change);

        let ctx = service
            .authenticate(&result.tokens.access_token.0)
            .await
            .unwrap();
        assert!(ctx.must_change_password);
    }

    #[tokio::test]
    async fn change_password_clears_the_gate_and_revokes_the_session() {
        let (service, _user, _users) = seeded_service(true).await;

        let result = service.login(login_input("Secret123!")).await.unwrap();
        let access = result.tokens.access_token.0.clone();

        // Policy violations are all reported.
        let err = service
            .change_password(&access, "Secret123!", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        service
            .change_password(&access, "Secret123!", "Brighter456$")
            .await
            .unwrap();

        // Old session is gone, old password no longer works.
        let err = service.authenticate(&access).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionRevoked));
        let err = service.login(login_input("Secret123!")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // New password logs in without the gate.
        let result = service.login(login_input("Brighter456$")).await.unwrap();
        assert!(!result.requires_password_change);
        let ctx = service
            .authenticate(&result.tokens.access_token.0)
            .await
            .unwrap();
        assert!(!ctx.must_change_password);
    }

    #[tokio::test]
    async fn deactivated_account_cannot_change_its_password() {
        let (service, user, users) = seeded_service(false).await;

        let result = service.login(login_input("Secret123!")).await.unwrap();
        let access = result.tokens.access_token.0.clone();

        // Deactivation lands while the access token is still live.
        users.insert(User {
            is_active: false,
            ..user.clone()
        });

        let err = service
            .change_password(&access, "Secret123!", "Brighter456$")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        // Reactivate: the stored credentials must be untouched.
        users.insert(user);
        let err = service.login(login_input("Brighter456$")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        service.login(login_input("Secret123!")).await.unwrap();
    }
}
