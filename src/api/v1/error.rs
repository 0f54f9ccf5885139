use crate::api::v1::handler::ApiResponse;
use crate::application_port::AuthError;
use serde::Serialize;
use std::convert::Infallible;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    MissingField,
    ValidationFailed,
    InvalidCredentials,
    InvalidToken,
    PasswordChangeRequired,
    NotFound,
    MethodNotAllowed,
    InternalError,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(ApiErrorCode::MissingField, format!("{} is required", field))
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!(%error, "internal error");
        Self::new(ApiErrorCode::InternalError, "Internal error")
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            ApiErrorCode::MissingField | ApiErrorCode::ValidationFailed => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::InvalidCredentials | ApiErrorCode::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::PasswordChangeRequired => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiError {}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => {
                // Deliberately generic: identical whether the email exists,
                // the password is wrong, or the account is deactivated.
                Self::new(ApiErrorCode::InvalidCredentials, "Invalid email or password")
            }
            AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::SessionRevoked
            | AuthError::UserNotFound => {
                Self::new(ApiErrorCode::InvalidToken, "Token is not valid")
            }
            AuthError::PasswordChangeRequired => Self::new(
                ApiErrorCode::PasswordChangeRequired,
                "Password change required before this action",
            ),
            AuthError::Validation(message) => {
                Self::new(ApiErrorCode::ValidationFailed, message)
            }
            AuthError::Store(e) => Self::internal(e),
            AuthError::InternalError(e) => Self::internal(e),
        }
    }
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiError>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        let err = ApiError::new(ApiErrorCode::MissingField, "Malformed request body");
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.find::<warp::reject::MissingHeader>().is_some() {
        let err = ApiError::new(ApiErrorCode::InvalidToken, "Token is not valid");
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        let err = ApiError::new(ApiErrorCode::MethodNotAllowed, "Method not allowed");
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.is_not_found() {
        let err = ApiError::new(ApiErrorCode::NotFound, "Not found");
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone()));
        Ok(warp::reply::with_status(json, err.status()))
    } else {
        // The raw rejection stays in the log; the body carries no detail.
        tracing::error!(rejection = ?err, "unhandled rejection");
        let err = ApiError::new(ApiErrorCode::InternalError, "Internal error");
        let json = warp::reply::json(&ApiResponse::<()>::err(err));
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}
