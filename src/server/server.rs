use crate::api::v1::RoutePolicy;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::{MemberRepo, TokenStore};
use crate::infra_memory::{MemoryMemberRepo, MemoryTokenStore};
use crate::infra_mysql::MySqlMemberRepo;
use crate::infra_redis::RedisTokenStore;
use crate::resilience::{CircuitBreakerConfig, TokenStoreGateway};
use crate::settings::Settings;
use chrono::Duration;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub member_service: Arc<dyn MemberService>,
    pub policy: RoutePolicy,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token_store: Arc<dyn TokenStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryTokenStore::new()),
            "redis" => {
                let client = redis::Client::open(settings.store.redis_url.as_str())?;
                Arc::new(RedisTokenStore::new(client.get_connection_manager().await?))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let breaker = &settings.store.breaker;
        let gateway = Arc::new(TokenStoreGateway::new(
            token_store,
            breaker.name.clone(),
            CircuitBreakerConfig {
                failure_rate_threshold: breaker.failure_rate_threshold,
                sliding_window_size: breaker.sliding_window_size,
                wait_duration_in_open_state: std::time::Duration::from_secs(
                    breaker.wait_duration_in_open_state_secs,
                ),
                permitted_calls_in_half_open_state: breaker.permitted_calls_in_half_open_state,
            },
            std::time::Duration::from_millis(breaker.call_timeout_ms),
        ));

        let member_repo: Arc<dyn MemberRepo> = match settings.member.backend.as_str() {
            "memory" => Arc::new(MemoryMemberRepo::new()),
            "mysql" => {
                let pool = Pool::<MySql>::connect(&settings.member.mysql_dsn).await?;
                Arc::new(MySqlMemberRepo::new(pool))
            }
            other => return Err(anyhow::anyhow!("Unknown member backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let signing_key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| "turnstile-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(&signing_key));

        let auth_service: Arc<dyn AuthService> = Arc::new(AuthServiceImpl::new(
            member_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            gateway,
            TokenTtls {
                access: Duration::seconds(settings.auth.access_ttl_secs),
                refresh: Duration::seconds(settings.auth.refresh_ttl_secs),
            },
        ));

        let member_service: Arc<dyn MemberService> =
            Arc::new(MemberServiceImpl::new(member_repo, credential_hasher));

        Ok(Server {
            auth_service,
            member_service,
            policy: RoutePolicy::default(),
        })
    }
}
