use crate::application_port::AuthError;
use crate::logger::warn;
use chrono::Utc;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Uniform client-facing error body. Auth failures carry nothing beyond the
/// catalog message; the interesting detail goes to the security audit log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Error)]
pub enum ApiErrorCode {
    #[error("Expired JWT token")]
    ExpiredToken,
    #[error("Invalid JWT signature")]
    InvalidSignature,
    #[error("Malformed JWT token")]
    MalformedToken,
    #[error("Unsupported JWT token")]
    UnsupportedToken,
    #[error("Token is missing or empty")]
    TokenNotFound,
    #[error("Token does not match server record")]
    TokenMismatch,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Member not found")]
    MemberNotFound,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Access denied")]
    Forbidden,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::ExpiredToken
            | ApiErrorCode::InvalidSignature
            | ApiErrorCode::MalformedToken
            | ApiErrorCode::UnsupportedToken
            | ApiErrorCode::TokenNotFound
            | ApiErrorCode::TokenMismatch
            | ApiErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::MemberNotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::UsernameTaken => StatusCode::CONFLICT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::ExpiredToken => ApiErrorCode::ExpiredToken,
            AuthError::InvalidSignature => ApiErrorCode::InvalidSignature,
            AuthError::MalformedToken => ApiErrorCode::MalformedToken,
            AuthError::UnsupportedToken => ApiErrorCode::UnsupportedToken,
            AuthError::TokenNotFound => ApiErrorCode::TokenNotFound,
            AuthError::TokenMismatch => ApiErrorCode::TokenMismatch,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::MemberNotFound => ApiErrorCode::MemberNotFound,
            AuthError::UsernameTaken => ApiErrorCode::UsernameTaken,
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

/// A bearer-token failure caught in the request pipeline, carrying the
/// request context the security audit log wants. None of that context ever
/// reaches the client body.
#[derive(Debug)]
pub struct AuthFailure {
    pub code: ApiErrorCode,
    pub uri: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl reject::Reject for AuthFailure {}

fn error_reply(code: &ApiErrorCode) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = code.status();
    let body = ErrorBody {
        status_code: status.as_u16(),
        message: code.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn plain_reply(status: StatusCode, message: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorBody {
        status_code: status.as_u16(),
        message: message.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(failure) = err.find::<AuthFailure>() {
        warn!(
            target: "security",
            message = %failure.code,
            uri = %failure.uri,
            ip = failure.ip.as_deref().unwrap_or("unknown"),
            user_agent = failure.user_agent.as_deref().unwrap_or("unknown"),
            "request authentication failed"
        );
        return Ok(error_reply(&failure.code));
    }

    if let Some(code) = err.find::<ApiErrorCode>() {
        return Ok(error_reply(code));
    }

    if err.is_not_found() {
        return Ok(plain_reply(StatusCode::NOT_FOUND, "Not found"));
    }

    if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        return Ok(plain_reply(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    warn!("Unhandled rejection: {:?}", err);
    Ok(plain_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal error",
    ))
}
