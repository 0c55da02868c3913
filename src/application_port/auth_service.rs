use crate::domain_model::{Principal, Role, TokenClaims, TokenPair, TokenType};
use chrono::Duration;

/// Every way an auth operation can fail. Token parsing reports exactly one
/// kind per call; store failures are absorbed by the gateway long before they
/// could reach this enum, so `Store` only surfaces from the member repository.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
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
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("member not found")]
    MemberNotFound,
    #[error("username already taken")]
    UsernameTaken,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub tokens: TokenPair,
}

/// Creates and parses signed tokens; the only component that knows the wire
/// encoding of claims.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Build, sign and serialize a claim set. `role` must be `Some` for
    /// access tokens and `None` for refresh tokens.
    async fn issue(
        &self,
        username: &str,
        role: Option<Role>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError>;

    /// Verify signature and structure, decode the claim set. Fails with
    /// exactly one of `ExpiredToken`, `InvalidSignature`, `MalformedToken`,
    /// `UnsupportedToken` or `TokenNotFound` (empty input).
    async fn parse(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Pure comparison of `exp` against the current time, independent of any
    /// `parse` outcome.
    fn is_expired(&self, claims: &TokenClaims) -> bool;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verify a username/password pair; on success issue a token pair and
    /// persist the refresh token.
    async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AuthError>;

    /// Validate a bearer access token and establish the caller's identity.
    /// A refresh token presented here is rejected as `UnsupportedToken`.
    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError>;

    /// Revoke the stored refresh token. Idempotent.
    async fn logout(&self, principal: &Principal) -> Result<(), AuthError>;

    /// Validate a presented refresh token against the server record and
    /// rotate both tokens. Every successful reissue invalidates the token
    /// that was just used.
    async fn reissue(&self, presented: Option<&str>) -> Result<LoginOutcome, AuthError>;
}
