use super::error::{ApiErrorCode, ErrorBody};
use crate::application_port::{LoginInput, SignupInput};
use crate::domain_model::{Principal, Role};
use crate::server::Server;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::{StatusCode, header};
use warp::{reject, reply};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn refresh_cookie(token: &str, max_age_secs: u64) -> String {
    format!("refreshToken={token}; Path=/; HttpOnly; Max-Age={max_age_secs}")
}

fn clear_refresh_cookie() -> String {
    "refreshToken=; Path=/; HttpOnly; Max-Age=0".to_string()
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub role: Role,
}

pub async fn login(
    _principal: Option<Principal>,
    body: LoginRequest,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let outcome = server
        .auth_service
        .login(LoginInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok(LoginResponse {
        username: outcome.principal.username,
        role: outcome.principal.role,
    });
    let reply = reply::json(&response);
    let reply = reply::with_header(
        reply,
        header::AUTHORIZATION,
        bearer(&outcome.tokens.access_token),
    );
    let reply = reply::with_header(
        reply,
        header::SET_COOKIE,
        refresh_cookie(
            &outcome.tokens.refresh_token,
            outcome.tokens.refresh_ttl_secs,
        ),
    );
    Ok(reply)
}

pub async fn logout(
    principal: Option<Principal>,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // The policy gate only lets authenticated requests through here.
    let principal = principal.ok_or_else(|| reject::custom(ApiErrorCode::TokenNotFound))?;

    server
        .auth_service
        .logout(&principal)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let reply = reply::with_status(reply::reply(), StatusCode::NO_CONTENT);
    Ok(reply::with_header(
        reply,
        header::SET_COOKIE,
        clear_refresh_cookie(),
    ))
}

pub async fn reissue(
    _principal: Option<Principal>,
    refresh_token: Option<String>,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let outcome = server
        .auth_service
        .reissue(refresh_token.as_deref())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok(LoginResponse {
        username: outcome.principal.username,
        role: outcome.principal.role,
    });
    let reply = reply::json(&response);
    let reply = reply::with_header(
        reply,
        header::AUTHORIZATION,
        bearer(&outcome.tokens.access_token),
    );
    Ok(reply::with_header(
        reply,
        header::SET_COOKIE,
        refresh_cookie(
            &outcome.tokens.refresh_token,
            outcome.tokens.refresh_ttl_secs,
        ),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

pub async fn signup(
    _principal: Option<Principal>,
    body: SignupRequest,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let view = server
        .member_service
        .signup(SignupInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply::with_status(
        reply::json(&ApiResponse::ok(view)),
        StatusCode::CREATED,
    ))
}

pub async fn list_members(
    _principal: Option<Principal>,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let members = server
        .member_service
        .list()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply::json(&ApiResponse::ok(members)))
}
