use super::error::{ApiErrorCode, AuthFailure};
use super::handler;
use super::policy::Access;
use crate::domain_model::Principal;
use crate::server::Server;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::Method;
use warp::path::FullPath;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let guard = guard(server.clone());

    let login = warp::post()
        .and(warp::path!("auth" / "login"))
        .and(guard.clone())
        .and(warp::body::json())
        .and(with(server.clone()))
        .and_then(handler::login);

    let logout = warp::delete()
        .and(warp::path!("auth" / "logout"))
        .and(guard.clone())
        .and(with(server.clone()))
        .and_then(handler::logout);

    let reissue = warp::post()
        .and(warp::path!("auth" / "reissue"))
        .and(guard.clone())
        .and(warp::cookie::optional::<String>("refreshToken"))
        .and(with(server.clone()))
        .and_then(handler::reissue);

    let signup = warp::post()
        .and(warp::path!("members"))
        .and(guard.clone())
        .and(warp::body::json())
        .and(with(server.clone()))
        .and_then(handler::signup);

    let list_members = warp::get()
        .and(warp::path!("members"))
        .and(guard)
        .and(with(server))
        .and_then(handler::list_members);

    login.or(logout).or(reissue).or(signup).or(list_members)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Request authenticator + policy gate. Establishes an optional request-
/// scoped principal from the bearer header, then applies the route policy;
/// both failure modes short-circuit the pipeline as structured rejections.
fn guard(
    server: Arc<Server>,
) -> impl Filter<Extract = (Option<Principal>,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::header::optional::<String>("user-agent"))
        .and(warp::addr::remote())
        .and(with(server))
        .and_then(authenticate_and_authorize)
}

async fn authenticate_and_authorize(
    method: Method,
    path: FullPath,
    authorization: Option<String>,
    user_agent: Option<String>,
    remote: Option<SocketAddr>,
    server: Arc<Server>,
) -> Result<Option<Principal>, warp::Rejection> {
    let auth_failure = |code: ApiErrorCode| {
        reject::custom(AuthFailure {
            code,
            uri: path.as_str().to_string(),
            ip: remote.map(|addr| addr.ip().to_string()),
            user_agent: user_agent.clone(),
        })
    };

    // A request without a bearer header proceeds unauthenticated; the policy
    // below decides whether that is enough for this route.
    let principal = match authorization.as_deref().and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => match server.auth_service.authenticate(token).await {
            Ok(principal) => Some(principal),
            Err(e) => return Err(auth_failure(e.into())),
        },
        None => None,
    };

    match server.policy.decide(&method, path.as_str()) {
        Access::Public => Ok(principal),
        Access::Role(required) => match &principal {
            Some(p) if p.role.satisfies(required) => Ok(principal),
            Some(_) => Err(reject::custom(ApiErrorCode::Forbidden)),
            None => Err(auth_failure(ApiErrorCode::TokenNotFound)),
        },
    }
}
