use crate::application_port::{
    AccessToken, AccessTokenData, AuthError, RefreshToken, RefreshTokenData, TokenCodec,
};
use crate::domain_model::{SessionId, User, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String, // user id as string
    email: String,
    role: String,
    sid: String, // session id
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    sid: String,
    ver: i64, // refresh_version at issue time
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

fn validation(cfg: &JwtConfig) -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    v
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    }
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
    }

    #[inline]
    fn parse_session_id(sid: &str) -> Result<SessionId, AuthError> {
        sid.parse::<SessionId>().map_err(|_| AuthError::TokenInvalid)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: &User,
        session_id: SessionId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + self.cfg.access_ttl;
        let claims = AccessClaims {
            sub: user.user_id.to_string(),
            email: user.email.clone(),
            role: user.role.to_string(),
            sid: session_id.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        user_id: UserId,
        session_id: SessionId,
        version: i64,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + self.cfg.refresh_ttl;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            ver: version,
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<AccessTokenData, AuthError> {
        let data = decode::<AccessClaims>(
            &token.0,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &validation(&self.cfg),
        )
        .map_err(map_decode_error)?;

        let claims = data.claims;
        Ok(AccessTokenData {
            user_id: Self::parse_user_id(&claims.sub)?,
            email: claims.email,
            role: claims.role.parse().map_err(|_| AuthError::TokenInvalid)?,
            session_id: Self::parse_session_id(&claims.sid)?,
        })
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenData, AuthError> {
        let data = decode::<RefreshClaims>(
            &token.0,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &validation(&self.cfg),
        )
        .map_err(map_decode_error)?;

        let claims = data.claims;
        Ok(RefreshTokenData {
            user_id: Self::parse_user_id(&claims.sub)?,
            session_id: Self::parse_session_id(&claims.sid)?,
            version: claims.ver,
        })
    }
}
