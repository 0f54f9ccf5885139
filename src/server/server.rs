use crate::application_impl::{
    Argon2CredentialHasher, JwtConfig, JwtHs256Codec, PortalAuthService, TokenService,
};
use crate::application_port::{AuthService, CredentialHasher, TokenCodec};
use crate::domain_port::{CacheStore, SessionRepo, UserRepo};
use crate::infra_memory::{MemorySessionRepo, MemoryUserRepo};
use crate::infra_mysql::{MySqlSessionRepo, MySqlUserRepo};
use crate::infra_redis::RedisFallbackCache;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

const CACHE_PREFIX: &str = "caregate";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub cache: Arc<dyn CacheStore>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        // A service that cannot sign tokens must not come up at all.
        let signing_key = std::env::var("JWT_SIGNING_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("JWT_SIGNING_KEY must be set and non-empty"))?
            .into_bytes();

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.jwt.issuer.clone(),
            audience: settings.jwt.audience.clone(),
            access_ttl: Duration::from_secs(settings.jwt.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.jwt.refresh_ttl_secs),
            signing_key,
        }));

        // The cache never blocks startup: a missing or bad Redis URL just
        // means the fallback tier serves until a probe succeeds.
        let op_timeout = Duration::from_millis(settings.redis.op_timeout_ms);
        let capacity = settings.cache.fallback_capacity;
        let cache: Arc<dyn CacheStore> = match settings.redis.url.as_deref() {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => Arc::new(RedisFallbackCache::new(
                    client,
                    CACHE_PREFIX,
                    op_timeout,
                    capacity,
                )),
                Err(e) => {
                    warn!(error = %e, "invalid redis url, cache starts in fallback mode");
                    Arc::new(RedisFallbackCache::disconnected(capacity))
                }
            },
            None => {
                info!("no redis url configured, cache runs in fallback mode");
                Arc::new(RedisFallbackCache::disconnected(capacity))
            }
        };

        let (user_repo, session_repo, pool): (
            Arc<dyn UserRepo>,
            Arc<dyn SessionRepo>,
            Option<Pool<MySql>>,
        ) = match settings.store.backend.as_str() {
            "mysql" => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.mysql_dsn is required for the mysql backend"))?;
                let pool = Pool::<MySql>::connect(dsn).await?;
                (
                    Arc::new(MySqlUserRepo::new(pool.clone())),
                    Arc::new(MySqlSessionRepo::new(pool.clone())),
                    Some(pool),
                )
            }
            "memory" => {
                warn!("memory store backend: sessions and users do not survive a restart");
                (
                    Arc::new(MemoryUserRepo::new()),
                    Arc::new(MemorySessionRepo::new()),
                    None,
                )
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2CredentialHasher);
        let token_service = Arc::new(TokenService::new(
            token_codec,
            session_repo,
            user_repo.clone(),
            cache.clone(),
        ));
        let auth_service: Arc<dyn AuthService> = Arc::new(PortalAuthService::new(
            user_repo,
            credential_hasher,
            token_service,
        ));

        Ok(Self {
            auth_service,
            cache,
            pool,
        })
    }

    /// Wiring for tests and embedded use; no database pool to manage.
    pub fn with_services(auth_service: Arc<dyn AuthService>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            auth_service,
            cache,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
