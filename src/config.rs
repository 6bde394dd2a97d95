use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// TTLs for the read-through cache. Aggregations tolerate more staleness
/// than lists, so the two are tuned independently.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub list_ttl_secs: u64,
    pub aggregation_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt: JwtConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let redis_url = std::env::var("REDIS_URL").ok();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "debtbook".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "debtbook-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let cache = CacheConfig {
            list_ttl_secs: std::env::var("CACHE_LIST_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3600),
            aggregation_ttl_secs: std::env::var("CACHE_AGGREGATION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3600),
        };
        Ok(Self {
            database_url,
            redis_url,
            jwt,
            cache,
        })
    }
}
