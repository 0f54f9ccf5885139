use super::error::*;
use super::handler;
use crate::application_port::{AuthContext, AuthService};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let logout = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let refresh = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    // Takes the raw bearer token instead of with_verification: this is the
    // one operation that must pass while the forced-change gate is up.
    let change_password = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("change-password"))
        .and(warp::path::end())
        .and(bearer_token())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::change_password);

    let session = warp::get()
        .and(warp::path("auth"))
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and_then(handler::session);

    let cache_health = warp::get()
        .and(warp::path("health"))
        .and(warp::path("cache"))
        .and(warp::path::end())
        .and(with(server.cache.clone()))
        .and_then(handler::cache_health);

    login
        .or(logout)
        .or(refresh)
        .or(change_password)
        .or(session)
        .or(cache_health)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn bearer_token() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(
        |header: String| async move {
            match header.strip_prefix("Bearer ") {
                Some(token) => Ok(token.to_string()),
                None => Err(reject::custom(ApiError::new(
                    ApiErrorCode::InvalidToken,
                    "Token is not valid",
                ))),
            }
        },
    )
}

/// Full verification for privileged routes, including the forced
/// password-change gate: a pending change turns every privileged request
/// into a 403 until it is completed.
pub fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (AuthContext,), Error = warp::Rejection> + Clone {
    bearer_token().and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            let context = auth_service
                .authenticate(&token)
                .await
                .map_err(ApiError::from)
                .map_err(reject::custom)?;
            if context.must_change_password {
                return Err(reject::custom(ApiError::new(
                    ApiErrorCode::PasswordChangeRequired,
                    "Password change required before this action",
                )));
            }
            Ok::<AuthContext, warp::Rejection>(context)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{
        Argon2CredentialHasher, JwtConfig, JwtHs256Codec, PortalAuthService, TokenService,
    };
    use crate::application_port::CredentialHasher;
    use crate::domain_model::{Role, User, UserId};
    use crate::infra_memory::{MemorySessionRepo, MemoryUserRepo};
    use crate::infra_redis::RedisFallbackCache;
    use serde_json::{Value, json};
    use std::time::Duration;
    use warp::http::StatusCode;

    async fn seeded_server(must_change: bool) -> Arc<Server> {
        let hasher = Arc::new(Argon2CredentialHasher);
        let users = Arc::new(MemoryUserRepo::new());
        users.insert(User {
            user_id: UserId(uuid::Uuid::new_v4()),
            email: "a@b.com".to_string(),
            password_hash: hasher.hash_password("Secret123!").await.unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            role: Role::Caregiver,
            is_active: true,
            must_change_password: must_change,
            last_login_at: None,
        });

        let codec = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "caregate.test".to_string(),
            audience: "portal".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            signing_key: b"unit-test-signing-key".to_vec(),
        }));
        let cache: Arc<dyn crate::domain_port::CacheStore> =
            Arc::new(RedisFallbackCache::disconnected(1024));
        let tokens = Arc::new(TokenService::new(
            codec,
            Arc::new(MemorySessionRepo::new()),
            users.clone(),
            cache.clone(),
        ));
        let auth_service: Arc<dyn AuthService> =
            Arc::new(PortalAuthService::new(users, hasher, tokens));

        Arc::new(Server::with_services(auth_service, cache))
    }

    macro_rules! api {
        ($must_change:expr) => {
            routes(seeded_server($must_change).await).recover(crate::api::v1::recover_error)
        };
    }

    macro_rules! login {
        ($api:expr) => {{
            let resp = warp::test::request()
                .method("POST")
                .path("/auth/login")
                .json(&json!({"email": "a@b.com", "password": "Secret123!"}))
                .reply($api)
                .await;
            assert_eq!(resp.status(), StatusCode::OK);
            serde_json::from_slice::<Value>(resp.body()).unwrap()
        }};
    }

    #[tokio::test]
    async fn login_rejects_missing_fields_with_400() {
        let api = api!(false);

        let resp = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&json!({"email": "a@b.com"}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("missing_field"));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_with_401() {
        let api = api!(false);

        let resp = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&json!({"email": "a@b.com", "password": "Nope12345!"}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"]["code"], json!("invalid_credentials"));
    }

    #[tokio::test]
    async fn login_then_session_round_trips() {
        let api = api!(false);
        let body = login!(&api);

        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["user"]["email"], json!("a@b.com"));
        let access = body["data"]["tokens"]["access_token"].as_str().unwrap();

        let resp = warp::test::request()
            .method("GET")
            .path("/auth/session")
            .header("authorization", format!("Bearer {}", access))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let session: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(session["data"]["role"], json!("caregiver"));
    }

    #[tokio::test]
    async fn session_without_a_bearer_token_is_401() {
        let api = api!(false);

        let missing = warp::test::request()
            .method("GET")
            .path("/auth/session")
            .reply(&api)
            .await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let garbage = warp::test::request()
            .method("GET")
            .path("/auth/session")
            .header("authorization", "Bearer not-a-jwt")
            .reply(&api)
            .await;
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn pending_password_change_turns_privileged_routes_into_403() {
        let api = api!(true);
        let body = login!(&api);
        assert_eq!(body["data"]["requires_password_change"], json!(true));
        let access = body["data"]["tokens"]["access_token"].as_str().unwrap();

        let resp = warp::test::request()
            .method("GET")
            .path("/auth/session")
            .header("authorization", format!("Bearer {}", access))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // The change itself must pass the gate.
        let resp = warp::test::request()
            .method("POST")
            .path("/auth/change-password")
            .header("authorization", format!("Bearer {}", access))
            .json(&json!({
                "current_password": "Secret123!",
                "new_password": "Brighter456$",
            }))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_is_200_even_for_garbage() {
        let api = api!(false);

        let resp = warp::test::request()
            .method("POST")
            .path("/auth/logout")
            .json(&json!({"session_id": "not-a-uuid"}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_maps_errors_to_400_and_401() {
        let api = api!(false);

        let missing = warp::test::request()
            .method("POST")
            .path("/auth/refresh")
            .json(&json!({}))
            .reply(&api)
            .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let garbage = warp::test::request()
            .method("POST")
            .path("/auth/refresh")
            .json(&json!({"refresh_token": "not-a-jwt"}))
            .reply(&api)
            .await;
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_method_is_405_without_internals() {
        let api = api!(false);

        let resp = warp::test::request()
            .method("GET")
            .path("/auth/login")
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"]["code"], json!("method_not_allowed"));
        assert_eq!(body["error"]["message"], json!("Method not allowed"));
    }

    #[tokio::test]
    async fn cache_health_reports_fallback_as_206() {
        let api = api!(false);

        let resp = warp::test::request()
            .method("GET")
            .path("/health/cache")
            .reply(&api)
            .await;

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["data"]["fallback_active"], json!(true));
        assert_eq!(body["data"]["functional"], json!(true));
    }
}
