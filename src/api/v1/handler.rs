use super::error::*;
use crate::application_port::{
    AuthContext, AuthService, LoginInput, LogoutInput, TokenPair, UserProfile,
};
use crate::domain_port::CacheStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

fn require(field: Option<String>, name: &str) -> Result<String, warp::Rejection> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(reject::custom(ApiError::missing_field(name))),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
    pub requires_password_change: bool,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let email = require(body.email, "email")?;
    let password = require(body.password, "password")?;

    let result = auth_service
        .login(LoginInput { email, password })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let response = LoginResponse {
        user: result.user,
        tokens: result.tokens,
        requires_password_change: result.requires_password_change,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_id: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse;

pub async fn logout(
    body: LogoutRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // The service already swallows every failure; logout is 200 no matter
    // what was in the body.
    let _ = auth_service
        .logout(LogoutInput {
            session_id: body.session_id,
            access_token: body.access_token,
        })
        .await;

    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub tokens: TokenPair,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refresh_token = require(body.refresh_token, "refresh_token")?;

    let tokens = auth_service
        .refresh(&refresh_token)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(RefreshResponse {
        tokens,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse;

pub async fn change_password(
    bearer_token: String,
    body: ChangePasswordRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let current = require(body.current_password, "current_password")?;
    let new = require(body.new_password, "new_password")?;

    auth_service
        .change_password(&bearer_token, &current, &new)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(ChangePasswordResponse)))
}

pub async fn session(context: AuthContext) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(context)))
}

#[derive(Debug, Serialize)]
pub struct CacheHealthResponse {
    pub remote_reachable: bool,
    pub fallback_active: bool,
    pub functional: bool,
}

/// Reports which cache tier serves reads and proves the active tier works
/// with a live write-read-delete round trip.
pub async fn cache_health(
    cache: Arc<dyn CacheStore>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let health = cache.health().await;

    let probe_key = format!("healthcheck:{}", uuid::Uuid::new_v4());
    cache.set(&probe_key, "ok", 5).await;
    let functional = cache.get(&probe_key).await.as_deref() == Some("ok");
    cache.del(&probe_key).await;

    let status = if !functional {
        StatusCode::SERVICE_UNAVAILABLE
    } else if health.fallback_active {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let response = CacheHealthResponse {
        remote_reachable: health.remote_reachable,
        fallback_active: health.fallback_active,
        functional,
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok(response)),
        status,
    ))
}
