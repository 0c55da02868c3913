use crate::application_port::{
    AuthError, AuthService, CredentialHasher, LoginInput, LoginOutcome, TokenCodec,
};
use crate::domain_model::{Principal, Role, TokenPair, TokenType};
use crate::domain_port::MemberRepo;
use crate::logger::warn;
use crate::resilience::TokenStoreGateway;
use chrono::Duration;
use std::sync::Arc;

const REFRESH_KEY_PREFIX: &str = "refreshToken:";

fn refresh_key(username: &str) -> String {
    format!("{REFRESH_KEY_PREFIX}{username}")
}

#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: Duration::hours(1),
            refresh: Duration::days(7),
        }
    }
}

pub struct AuthServiceImpl {
    member_repo: Arc<dyn MemberRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    token_store: Arc<TokenStoreGateway>,
    ttls: TokenTtls,
}

impl AuthServiceImpl {
    pub fn new(
        member_repo: Arc<dyn MemberRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        token_store: Arc<TokenStoreGateway>,
        ttls: TokenTtls,
    ) -> Self {
        Self {
            member_repo,
            credential_hasher,
            token_codec,
            token_store,
            ttls,
        }
    }

    /// Issue a fresh access/refresh pair and overwrite the stored refresh
    /// slot. The overwrite implicitly invalidates any previous value; at most
    /// one refresh token per username is ever live.
    async fn issue_pair(&self, username: &str, role: Role) -> Result<TokenPair, AuthError> {
        let access_token = self
            .token_codec
            .issue(username, Some(role), TokenType::Access, self.ttls.access)
            .await?;
        let refresh_token = self
            .token_codec
            .issue(username, None, TokenType::Refresh, self.ttls.refresh)
            .await?;

        let refresh_ttl_secs = self.ttls.refresh.num_seconds().max(1) as u64;
        self.token_store
            .set(&refresh_key(username), &refresh_token, refresh_ttl_secs)
            .await;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_ttl_secs,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for AuthServiceImpl {
    async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AuthError> {
        let LoginInput { username, password } = input;

        // Both failure paths collapse to the same client-facing error so a
        // caller cannot probe which usernames exist.
        let Some(record) = self.member_repo.find_by_username(&username).await? else {
            warn!(target: "security", %username, "login failed: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = self
            .credential_hasher
            .verify_password(&password, &record.password_hash)
            .await?;
        if !password_ok {
            warn!(target: "security", %username, "login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&record.username, record.role).await?;
        Ok(LoginOutcome {
            principal: Principal {
                username: record.username,
                role: record.role,
            },
            tokens,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.token_codec.parse(token).await?;

        if self.token_codec.is_expired(&claims) {
            return Err(AuthError::ExpiredToken);
        }
        if claims.token_type != TokenType::Access {
            return Err(AuthError::UnsupportedToken);
        }

        let role = claims.role.ok_or(AuthError::MalformedToken)?;
        Ok(Principal {
            username: claims.username,
            role,
        })
    }

    async fn logout(&self, principal: &Principal) -> Result<(), AuthError> {
        self.token_store
            .delete(&refresh_key(&principal.username))
            .await;
        Ok(())
    }

    async fn reissue(&self, presented: Option<&str>) -> Result<LoginOutcome, AuthError> {
        let presented = match presented {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Err(AuthError::TokenNotFound),
        };

        let claims = self.token_codec.parse(presented).await?;

        // A degraded gateway reads as absent here, which downgrades the
        // session to "force re-login" instead of failing the request harder.
        let key = refresh_key(&claims.username);
        let stored = self
            .token_store
            .get(&key)
            .await
            .ok_or(AuthError::TokenNotFound)?;

        // A stale or replayed token from before the last rotation.
        if stored != presented {
            return Err(AuthError::TokenMismatch);
        }

        let record = self
            .member_repo
            .find_by_username(&claims.username)
            .await?
            .ok_or(AuthError::MemberNotFound)?;

        let tokens = self.issue_pair(&record.username, record.role).await?;
        Ok(LoginOutcome {
            principal: Principal {
                username: record.username,
                role: record.role,
            },
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtHs256Codec};
    use crate::domain_port::{MemberRecord, StoreError, TokenStore};
    use crate::infra_memory::{MemoryMemberRepo, MemoryTokenStore};
    use crate::resilience::CircuitBreakerConfig;

    async fn service_with_store(store: Arc<dyn TokenStore>) -> AuthServiceImpl {
        let repo = Arc::new(MemoryMemberRepo::new());
        let hasher = Arc::new(Argon2PasswordHasher);
        let hash = hasher.hash_password("pw1").await.unwrap();
        repo.insert(MemberRecord {
            username: "alice".to_string(),
            password_hash: hash,
            role: Role::Member,
        })
        .await
        .unwrap();

        let gateway = Arc::new(TokenStoreGateway::new(
            store,
            "tokenStoreBreaker",
            CircuitBreakerConfig::default(),
            std::time::Duration::from_millis(100),
        ));
        AuthServiceImpl::new(
            repo,
            hasher,
            Arc::new(JwtHs256Codec::new(b"unit-test-signing-key")),
            gateway,
            TokenTtls::default(),
        )
    }

    async fn service() -> AuthServiceImpl {
        service_with_store(Arc::new(MemoryTokenStore::new())).await
    }

    fn login_input(username: &str, password: &str) -> LoginInput {
        LoginInput {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_issues_a_pair_and_establishes_the_principal() {
        let service = service().await;
        let outcome = service.login(login_input("alice", "pw1")).await.unwrap();

        assert_eq!(outcome.principal.username, "alice");
        assert_eq!(outcome.principal.role, Role::Member);

        let principal = service
            .authenticate(&outcome.tokens.access_token)
            .await
            .unwrap();
        assert_eq!(principal, outcome.principal);
    }

    #[tokio::test]
    async fn login_failure_is_uniform_for_unknown_user_and_bad_password() {
        let service = service().await;
        assert_eq!(
            service.login(login_input("alice", "wrong")).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            service.login(login_input("nobody", "pw1")).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_bearer_credential() {
        let service = service().await;
        let outcome = service.login(login_input("alice", "pw1")).await.unwrap();

        assert_eq!(
            service.authenticate(&outcome.tokens.refresh_token).await,
            Err(AuthError::UnsupportedToken)
        );
    }

    #[tokio::test]
    async fn reissue_rotates_and_invalidates_the_presented_token() {
        let service = service().await;
        let first = service.login(login_input("alice", "pw1")).await.unwrap();

        let second = service
            .reissue(Some(&first.tokens.refresh_token))
            .await
            .unwrap();
        assert_ne!(second.tokens.refresh_token, first.tokens.refresh_token);
        assert_eq!(second.principal, first.principal);

        // The old token was consumed by the rotation.
        assert_eq!(
            service.reissue(Some(&first.tokens.refresh_token)).await,
            Err(AuthError::TokenMismatch)
        );
        // The new one is the single live slot.
        service
            .reissue(Some(&second.tokens.refresh_token))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn logout_revokes_and_is_idempotent() {
        let service = service().await;
        let outcome = service.login(login_input("alice", "pw1")).await.unwrap();

        service.logout(&outcome.principal).await.unwrap();
        assert_eq!(
            service.reissue(Some(&outcome.tokens.refresh_token)).await,
            Err(AuthError::TokenNotFound)
        );
        service.logout(&outcome.principal).await.unwrap();
    }

    #[tokio::test]
    async fn reissue_without_a_token_is_not_found() {
        let service = service().await;
        assert_eq!(service.reissue(None).await, Err(AuthError::TokenNotFound));
        assert_eq!(
            service.reissue(Some("")).await,
            Err(AuthError::TokenNotFound)
        );
    }

    #[tokio::test]
    async fn parse_failures_propagate_from_reissue() {
        let service = service().await;
        assert_eq!(
            service.reissue(Some("not.a.jwt")).await,
            Err(AuthError::MalformedToken)
        );
    }

    #[tokio::test]
    async fn degraded_store_forces_re_login_but_never_breaks_login() {
        struct DownStore;

        #[async_trait::async_trait]
        impl TokenStore for DownStore {
            async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
                Err(StoreError("connection refused".into()))
            }
            async fn set(&self, _k: &str, _v: &str, _ttl: u64) -> Result<(), StoreError> {
                Err(StoreError("connection refused".into()))
            }
            async fn delete(&self, _k: &str) -> Result<(), StoreError> {
                Err(StoreError("connection refused".into()))
            }
        }

        let service = service_with_store(Arc::new(DownStore)).await;

        // Login still succeeds; the refresh persist degrades to a no-op.
        let outcome = service.login(login_input("alice", "pw1")).await.unwrap();

        // With nothing on record, reissue degrades to "force re-login".
        assert_eq!(
            service.reissue(Some(&outcome.tokens.refresh_token)).await,
            Err(AuthError::TokenNotFound)
        );
    }
}
