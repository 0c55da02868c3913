use crate::application_port::{AuthError, TokenCodec};
use crate::domain_model::{Role, TokenClaims, TokenType};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// HS256 JWT codec. Claims go on the wire as
/// `{username, type, role?, iat, exp}`; `role` is present only on access
/// tokens.
pub struct JwtHs256Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHs256Codec {
    pub fn new(signing_key: &[u8]) -> Self {
        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry must be exact: an access token that expired a second ago is
        // already an `ExpiredToken`, not a still-valid one.
        validation.leeway = 0;
        validation
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue(
        &self,
        username: &str,
        role: Option<Role>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let role = match token_type {
            TokenType::Access => Some(role.ok_or_else(|| {
                AuthError::Internal("access token issued without a role".to_string())
            })?),
            TokenType::Refresh => None,
        };

        let now = Utc::now();
        let claims = TokenClaims {
            username: username.to_string(),
            token_type,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn parse(&self, token: &str) -> Result<TokenClaims, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::TokenNotFound);
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    AuthError::UnsupportedToken
                }
                _ => AuthError::MalformedToken,
            })?;

        Ok(data.claims)
    }

    fn is_expired(&self, claims: &TokenClaims) -> bool {
        claims.is_expired_at(Utc::now())
    }
}
